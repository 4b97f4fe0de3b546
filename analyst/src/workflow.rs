//! The data-analysis flow.
//!
//! Uploads a dataset, lets a code-interpreter agent chart it, then saves every
//! generated image locally and copies it to blob storage. The uploaded file
//! and the agent are released when the flow ends; the thread and the local
//! images are kept.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use tracing::{info, warn};

use crate::agents::{
    AgentService, CodeInterpreterTool, CreateAgentRequest, CreateMessageRequest, FileInfo,
    FilePurpose, MessageRole, RunStatus, ThreadRun,
};
use crate::error::Result;
use crate::storage::{BlobStore, BlobUploadResult, UploadOptions};

/// Dataset uploaded when no other file is given.
pub const DEFAULT_DATA_FILE: &str = "sample_dataset.csv";
/// Name of the created agent.
pub const DEFAULT_AGENT_NAME: &str = "my-data-analyst-agent";
/// Instructions of the created agent.
pub const DEFAULT_INSTRUCTIONS: &str = "You are helpful agent";
/// Request sent to the agent.
pub const DEFAULT_PROMPT: &str = "Could you please create bar chart with a breakdown of personnel types across all years in the dataset?";

/// When the uploaded file and the agent are deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// On every exit path, including failures.
    #[default]
    Always,
    /// Only after the flow succeeded; failures leave both on the platform.
    OnSuccess,
}

/// Inputs of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Dataset to upload.
    pub data_file: PathBuf,
    /// Agent name.
    pub agent_name: String,
    /// Agent instructions.
    pub instructions: String,
    /// User request.
    pub prompt: String,
    /// Directory receiving `<file_id>.png` images.
    pub output_dir: PathBuf,
    /// Cleanup behaviour.
    pub cleanup: CleanupPolicy,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            agent_name: DEFAULT_AGENT_NAME.to_owned(),
            instructions: DEFAULT_INSTRUCTIONS.to_owned(),
            prompt: DEFAULT_PROMPT.to_owned(),
            output_dir: PathBuf::from("."),
            cleanup: CleanupPolicy::default(),
        }
    }
}

impl AnalysisOptions {
    /// Sets the dataset path.
    #[must_use]
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    /// Sets the agent name.
    #[must_use]
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    /// Sets the agent instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Sets the user request.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the image output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the cleanup policy.
    #[must_use]
    pub const fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }
}

/// An image saved locally and uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    /// Platform file id.
    pub file_id: String,
    /// Local copy.
    pub local_path: PathBuf,
    /// Uploaded blob.
    pub blob: BlobUploadResult,
}

/// Outcome of a completed flow.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Uploaded dataset (deleted by now).
    pub file_id: String,
    /// Created agent (deleted by now).
    pub agent_id: String,
    /// Conversation thread (kept).
    pub thread_id: String,
    /// Final state of the run.
    pub run: ThreadRun,
    /// Text replies of the agent, in listing order.
    pub replies: Vec<String>,
    /// Images in listing order.
    pub images: Vec<SavedImage>,
}

/// Platform resources created so far.
#[derive(Debug, Default)]
struct Created {
    file_id: Option<String>,
    agent_id: Option<String>,
}

/// Callback invoked after each image is saved and uploaded.
type ImageHook<'a> = Box<dyn Fn(&SavedImage) + Send + Sync + 'a>;

/// The analysis flow over an agent service and a blob store.
pub struct Analysis<'a, A: ?Sized, B: ?Sized> {
    agents: &'a A,
    blobs: &'a B,
    model: String,
    options: AnalysisOptions,
    on_image: Option<ImageHook<'a>>,
}

impl<A: ?Sized, B: ?Sized> fmt::Debug for Analysis<'_, A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analysis")
            .field("model", &self.model)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a, A, B> Analysis<'a, A, B>
where
    A: AgentService + ?Sized,
    B: BlobStore + ?Sized,
{
    /// Creates a flow using `model` for the agent and default options.
    #[must_use]
    pub fn new(agents: &'a A, blobs: &'a B, model: impl Into<String>) -> Self {
        Self {
            agents,
            blobs,
            model: model.into(),
            options: AnalysisOptions::default(),
            on_image: None,
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Calls `hook` as soon as each image is persisted, before later steps run.
    #[must_use]
    pub fn on_image<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SavedImage) + Send + Sync + 'a,
    {
        self.on_image = Some(Box::new(hook));
        self
    }

    /// Runs the flow to completion.
    pub async fn run(&self) -> Result<AnalysisReport> {
        let uploaded = self
            .agents
            .upload_file(&self.options.data_file, FilePurpose::Agents)
            .await?;
        info!(file_id = %uploaded.id, path = %self.options.data_file.display(), "uploaded dataset");

        let mut created = Created {
            file_id: Some(uploaded.id.clone()),
            agent_id: None,
        };
        let outcome = self.analyze(uploaded, &mut created).await;

        match outcome {
            Ok(report) => {
                self.release(&created).await?;
                Ok(report)
            }
            Err(err) => {
                match self.options.cleanup {
                    CleanupPolicy::Always => {
                        if let Err(cleanup_err) = self.release(&created).await {
                            warn!(error = %cleanup_err, "cleanup after failure also failed");
                        }
                    }
                    CleanupPolicy::OnSuccess => warn!(
                        file_id = ?created.file_id,
                        agent_id = ?created.agent_id,
                        "flow failed, leaving uploaded file and agent in place"
                    ),
                }
                Err(err)
            }
        }
    }

    async fn analyze(&self, uploaded: FileInfo, created: &mut Created) -> Result<AnalysisReport> {
        let file = self.agents.wait_for_file(uploaded).await?;

        let code_interpreter = CodeInterpreterTool::new([file.id.as_str()]);
        let request = CreateAgentRequest::new(&self.model)
            .with_name(&self.options.agent_name)
            .with_instructions(&self.options.instructions)
            .with_code_interpreter(&code_interpreter);
        let agent = self.agents.create_agent(&request).await?;
        created.agent_id = Some(agent.id.clone());

        let thread = self.agents.create_thread().await?;
        info!(thread_id = %thread.id, "created thread");
        self.agents
            .create_message(&thread.id, &CreateMessageRequest::user(&self.options.prompt))
            .await?;

        let run = self.agents.create_and_process_run(&thread.id, &agent.id).await?;
        if run.status != RunStatus::Completed {
            warn!(
                run_id = %run.id,
                status = ?run.status,
                error = ?run.last_error,
                "run did not complete, processing the messages it left"
            );
        }

        let messages = self.agents.list_messages(&thread.id).await?;
        let mut replies = Vec::new();
        let mut images = Vec::new();
        for message in &messages {
            if message.role == MessageRole::Assistant {
                replies.extend(message.text_contents().map(str::to_owned));
            }
            for image in message.image_contents() {
                let saved = self.persist_image(&image.file_id).await?;
                if let Some(hook) = &self.on_image {
                    hook(&saved);
                }
                images.push(saved);
            }
        }
        info!(messages = messages.len(), images = images.len(), "processed messages");

        Ok(AnalysisReport {
            file_id: file.id.clone(),
            agent_id: agent.id,
            thread_id: thread.id,
            run,
            replies,
            images,
        })
    }

    /// Saves one image locally, then uploads the local copy.
    async fn persist_image(&self, file_id: &str) -> Result<SavedImage> {
        let file_name = format!("{file_id}.png");
        let target = self.options.output_dir.join(&file_name);

        let local_path = self.agents.save_file(file_id, &target).await?;
        info!(path = %local_path.display(), "saved image file");

        let data = Bytes::from(tokio::fs::read(&local_path).await?);
        let blob = self
            .blobs
            .upload_blob(&file_name, data, &UploadOptions::overwrite())
            .await?;
        info!(blob = %blob.name, "uploaded image to blob storage");

        Ok(SavedImage {
            file_id: file_id.to_owned(),
            local_path,
            blob,
        })
    }

    /// Deletes the file, then the agent. Both are attempted; the first error wins.
    async fn release(&self, created: &Created) -> Result<()> {
        let mut first_error = None;

        if let Some(file_id) = &created.file_id {
            match self.agents.delete_file(file_id).await {
                Ok(()) => info!(file_id = %file_id, "deleted uploaded file"),
                Err(err) => {
                    warn!(file_id = %file_id, error = %err, "failed to delete uploaded file");
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(agent_id) = &created.agent_id {
            match self.agents.delete_agent(agent_id).await {
                Ok(()) => info!(agent_id = %agent_id, "deleted agent"),
                Err(err) => {
                    warn!(agent_id = %agent_id, error = %err, "failed to delete agent");
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
