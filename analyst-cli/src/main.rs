//! Analyst CLI - Data analysis with a code-interpreter agent
//!
//! Uploads a dataset, asks an agent to chart it and copies the charts to blob storage.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use analyst::config::Settings;
use analyst::error::Result;
use analyst::prelude::*;
use analyst::workflow::{DEFAULT_AGENT_NAME, DEFAULT_DATA_FILE, DEFAULT_INSTRUCTIONS, DEFAULT_PROMPT};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Analyst - chart a dataset with a code-interpreter agent
#[derive(Parser)]
#[command(name = "analyst")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration without calling any service
    Check,
}

/// Arguments for an analysis run
#[derive(Args)]
struct RunArgs {
    /// Dataset to upload
    #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
    data_file: PathBuf,

    /// Request sent to the agent
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Agent instructions
    #[arg(long, default_value = DEFAULT_INSTRUCTIONS)]
    instructions: String,

    /// Agent name
    #[arg(long, default_value = DEFAULT_AGENT_NAME)]
    agent_name: String,

    /// Directory for downloaded images
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Keep the uploaded file and the agent when the run fails
    #[arg(long)]
    keep_on_failure: bool,

    /// Delay between status polls, in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,
}

impl RunArgs {
    fn options(&self) -> AnalysisOptions {
        let cleanup = if self.keep_on_failure {
            CleanupPolicy::OnSuccess
        } else {
            CleanupPolicy::Always
        };
        AnalysisOptions::default()
            .with_data_file(&self.data_file)
            .with_prompt(&self.prompt)
            .with_instructions(&self.instructions)
            .with_agent_name(&self.agent_name)
            .with_output_dir(&self.output_dir)
            .with_cleanup(cleanup)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    if let Err(e) = load_env_file(cli.env_file.as_deref()) {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "analyst={level},analyst_cli={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Load a dotenv file. Only an explicitly named file has to exist.
fn load_env_file(path: Option<&Path>) -> std::result::Result<(), String> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| format!("failed to load env file {}: {e}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded env file");
        }
        None => match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(format!("failed to load .env: {e}")),
        },
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    tracing::debug!(?settings, "loaded settings");

    let credential: Arc<dyn TokenCredential> = Arc::new(DefaultCredential::new());
    let agents = AgentsClient::new(
        AgentsConfig::new(&settings.project_endpoint)
            .with_poll_interval(Duration::from_millis(cli.run.poll_interval_ms)),
        credential,
    )?;
    let container = BlobServiceClient::from_connection_string(&settings.blob_connection_string)?
        .container_client(&settings.container_name);

    match cli.command {
        Some(Commands::Check) => {
            check(&agents, &container, &settings);
            Ok(())
        }
        None => analyze(&agents, &container, &settings, &cli.run).await,
    }
}

fn check(agents: &AgentsClient, container: &ContainerClient, settings: &Settings) {
    println!("Project endpoint: {}", agents.endpoint());
    println!("Model deployment: {}", settings.model_deployment_name);
    println!("Blob container:   {}", container.container_name());
    println!("Configuration is valid.");
}

async fn analyze(
    agents: &AgentsClient,
    container: &ContainerClient,
    settings: &Settings,
    args: &RunArgs,
) -> Result<()> {
    let report = Analysis::new(agents, container, &settings.model_deployment_name)
        .with_options(args.options())
        .on_image(|image| {
            let path = std::path::absolute(&image.local_path)
                .unwrap_or_else(|_| image.local_path.clone());
            println!("Saved image file to: {}", path.display());
            println!("Uploaded to blob storage.");
        })
        .run()
        .await?;

    println!("Run finished with status: {:?}", report.run.status);
    if let Some(error) = &report.run.last_error {
        println!("Run failed: {} ({})", error.message, error.code);
    }
    for reply in &report.replies {
        println!("{reply}");
    }
    println!("Deleted file and agent.");
    Ok(())
}
