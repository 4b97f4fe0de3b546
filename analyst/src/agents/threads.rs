//! Threads and messages.

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::error::Result;

use super::client::AgentsClient;
use super::types::{
    AgentThread, CreateMessageRequest, ListOrder, ListQuery, ListResponse, ThreadMessage,
};

/// Page size used when draining a thread.
const MESSAGE_PAGE_SIZE: u32 = 100;

impl AgentsClient {
    /// Create an empty thread.
    pub async fn create_thread(&self) -> Result<AgentThread> {
        let request = self.request(Method::POST, self.url(&["threads"])).await?;
        let thread: AgentThread = self.execute_json(request.json(&json!({}))).await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(thread)
    }

    /// Append a message to a thread.
    pub async fn create_message(
        &self,
        thread_id: &str,
        body: &CreateMessageRequest,
    ) -> Result<ThreadMessage> {
        let request = self
            .request(Method::POST, self.url(&["threads", thread_id, "messages"]))
            .await?;
        let message: ThreadMessage = self.execute_json(request.json(body)).await?;
        debug!(thread_id, message_id = %message.id, role = ?message.role, "created message");
        Ok(message)
    }

    /// List one page of messages.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        query: &ListQuery,
    ) -> Result<ListResponse<ThreadMessage>> {
        let mut url = self.url(&["threads", thread_id, "messages"]);
        url.query_pairs_mut().extend_pairs(query.pairs());

        let request = self.request(Method::GET, url).await?;
        self.execute_json(request).await
    }

    /// List every message of a thread, newest first, following pagination.
    pub async fn list_all_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let mut query = ListQuery {
            limit: Some(MESSAGE_PAGE_SIZE),
            order: Some(ListOrder::Desc),
            ..ListQuery::default()
        };
        let mut messages = Vec::new();

        loop {
            let page = self.list_messages(thread_id, &query).await?;
            let next = page.last_id.clone().or_else(|| page.data.last().map(|m| m.id.clone()));
            let has_more = page.has_more;
            messages.extend(page.data);

            match next {
                Some(cursor) if has_more => query.after = Some(cursor),
                _ => break,
            }
        }

        debug!(thread_id, count = messages.len(), "listed messages");
        Ok(messages)
    }
}
