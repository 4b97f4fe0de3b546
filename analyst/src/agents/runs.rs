//! Runs and run polling.

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::error::Result;

use super::client::AgentsClient;
use super::types::{CreateRunRequest, RunStatus, ThreadRun};

impl AgentsClient {
    /// Start a run of `agent_id` on `thread_id`.
    pub async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun> {
        let request = self
            .request(Method::POST, self.url(&["threads", thread_id, "runs"]))
            .await?;
        let run: ThreadRun = self
            .execute_json(request.json(&CreateRunRequest::new(agent_id)))
            .await?;
        debug!(thread_id, run_id = %run.id, status = ?run.status, "created run");
        Ok(run)
    }

    /// Retrieve a run.
    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun> {
        let request = self
            .request(Method::GET, self.url(&["threads", thread_id, "runs", run_id]))
            .await?;
        self.execute_json(request).await
    }

    /// Request cancellation of a run.
    pub async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun> {
        let request = self
            .request(
                Method::POST,
                self.url(&["threads", thread_id, "runs", run_id, "cancel"]),
            )
            .await?;
        self.execute_json(request).await
    }

    /// Start a run and poll it until it reaches a terminal state.
    ///
    /// No client-side tools are registered, so a run asking for tool outputs
    /// cannot make progress and is cancelled.
    pub async fn create_and_process_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun> {
        let mut run = self.create_run(thread_id, agent_id).await?;

        while !run.status.is_terminal() {
            tokio::time::sleep(self.config.poll_interval).await;
            run = self.get_run(thread_id, &run.id).await?;
            debug!(run_id = %run.id, status = ?run.status, "polled run");

            if run.status == RunStatus::RequiresAction {
                warn!(run_id = %run.id, "run requires tool outputs that no local tool provides, cancelling");
                run = self.cancel_run(thread_id, &run.id).await?;
            }
        }

        info!(run_id = %run.id, status = ?run.status, "run finished");
        Ok(run)
    }
}
