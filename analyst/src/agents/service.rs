//! The agent platform operations the analysis flow depends on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

use super::client::AgentsClient;
use super::types::{
    Agent, AgentThread, CreateAgentRequest, CreateMessageRequest, FileInfo, FilePurpose,
    ThreadMessage, ThreadRun,
};

/// Remote agent platform as seen by the analysis flow.
///
/// [`AgentsClient`] is the production implementation; tests substitute
/// recording doubles.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Upload a local file. Processing may still be running.
    async fn upload_file(&self, path: &Path, purpose: FilePurpose) -> Result<FileInfo>;

    /// Wait until an uploaded file is processed.
    async fn wait_for_file(&self, file: FileInfo) -> Result<FileInfo>;

    /// Create an agent.
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent>;

    /// Create an empty thread.
    async fn create_thread(&self) -> Result<AgentThread>;

    /// Append a message to a thread.
    async fn create_message(
        &self,
        thread_id: &str,
        request: &CreateMessageRequest,
    ) -> Result<ThreadMessage>;

    /// Run an agent on a thread until the run is terminal.
    async fn create_and_process_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun>;

    /// All messages of a thread, in platform order.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Download a file to `target`.
    async fn save_file(&self, file_id: &str, target: &Path) -> Result<PathBuf>;

    /// Delete an uploaded file.
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// Delete an agent.
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;
}

#[async_trait]
impl AgentService for AgentsClient {
    async fn upload_file(&self, path: &Path, purpose: FilePurpose) -> Result<FileInfo> {
        Self::upload_file(self, path, purpose).await
    }

    async fn wait_for_file(&self, file: FileInfo) -> Result<FileInfo> {
        Self::wait_for_file(self, file).await
    }

    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent> {
        Self::create_agent(self, request).await
    }

    async fn create_thread(&self) -> Result<AgentThread> {
        Self::create_thread(self).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        request: &CreateMessageRequest,
    ) -> Result<ThreadMessage> {
        Self::create_message(self, thread_id, request).await
    }

    async fn create_and_process_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun> {
        Self::create_and_process_run(self, thread_id, agent_id).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        self.list_all_messages(thread_id).await
    }

    async fn save_file(&self, file_id: &str, target: &Path) -> Result<PathBuf> {
        Self::save_file(self, file_id, target).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        Self::delete_file(self, file_id).await.map(drop)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        Self::delete_agent(self, agent_id).await.map(drop)
    }
}
