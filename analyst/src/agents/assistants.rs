//! Agent lifecycle.

use reqwest::Method;
use tracing::{debug, info};

use crate::error::Result;

use super::client::AgentsClient;
use super::types::{Agent, CreateAgentRequest, DeletionStatus};

impl AgentsClient {
    /// Create an agent.
    pub async fn create_agent(&self, body: &CreateAgentRequest) -> Result<Agent> {
        let request = self.request(Method::POST, self.url(&["assistants"])).await?;
        let agent: Agent = self.execute_json(request.json(body)).await?;
        info!(agent_id = %agent.id, model = %agent.model, "created agent");
        Ok(agent)
    }

    /// Delete an agent.
    pub async fn delete_agent(&self, agent_id: &str) -> Result<DeletionStatus> {
        let request = self
            .request(Method::DELETE, self.url(&["assistants", agent_id]))
            .await?;
        let status: DeletionStatus = self.execute_json(request).await?;
        debug!(agent_id, deleted = status.deleted, "deleted agent");
        Ok(status)
    }
}
