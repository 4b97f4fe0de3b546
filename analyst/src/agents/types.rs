//! Wire models for the agent platform.
//!
//! Unknown enum values from the service deserialize to an `Unknown` variant so
//! that newer platform versions do not break parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Intended use of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    /// Input for agents and their tools.
    #[serde(rename = "assistants")]
    Agents,
    /// Output produced by agents.
    #[serde(rename = "assistants_output")]
    AgentsOutput,
    /// Batch input.
    Batch,
    /// Fine-tuning input.
    #[serde(rename = "fine-tune")]
    FineTune,
    /// Image input.
    Vision,
    /// Value not known to this client.
    #[serde(other)]
    Unknown,
}

impl FilePurpose {
    /// Wire value of the purpose.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "assistants",
            Self::AgentsOutput => "assistants_output",
            Self::Batch => "batch",
            Self::FineTune => "fine-tune",
            Self::Vision => "vision",
            Self::Unknown => "unknown",
        }
    }
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Received, processing not started.
    Uploaded,
    /// Waiting for processing.
    Pending,
    /// Being processed.
    Running,
    /// Ready for use.
    Processed,
    /// Processing failed.
    Error,
    /// Being deleted.
    Deleting,
    /// Deleted.
    Deleted,
    /// Value not known to this client.
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    /// Whether the platform is still working on the file.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Uploaded | Self::Pending | Self::Running)
    }
}

/// A file stored on the agent platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File identifier.
    pub id: String,
    /// Object type, always `file`.
    #[serde(default)]
    pub object: String,
    /// Size in bytes.
    #[serde(default)]
    pub bytes: u64,
    /// Original file name.
    #[serde(default)]
    pub filename: String,
    /// Creation time (unix seconds).
    #[serde(default)]
    pub created_at: i64,
    /// Intended use.
    pub purpose: FilePurpose,
    /// Processing state.
    #[serde(default)]
    pub status: Option<FileStatus>,
    /// Details for the `error` state.
    #[serde(default)]
    pub status_details: Option<String>,
}

/// Result of a delete call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionStatus {
    /// Identifier of the deleted object.
    pub id: String,
    /// Whether the object was deleted.
    pub deleted: bool,
    /// Object type of the deletion record.
    #[serde(default)]
    pub object: String,
}

/// A tool an agent may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// Sandboxed code execution.
    CodeInterpreter,
    /// Retrieval over vector stores.
    FileSearch,
    /// Tool type not known to this client.
    #[serde(other)]
    Unknown,
}

/// Resources for the code interpreter tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInterpreterResource {
    /// Files made available to the sandbox.
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// Resources bound to an agent's tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResources {
    /// Code interpreter resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_interpreter: Option<CodeInterpreterResource>,
}

/// Code interpreter tool descriptor bound to a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeInterpreterTool {
    file_ids: Vec<String>,
}

impl CodeInterpreterTool {
    /// Creates a descriptor bound to the given files.
    #[must_use]
    pub fn new<I, S>(file_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_ids: file_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Tool definitions to register on the agent.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::CodeInterpreter]
    }

    /// Tool resources to register on the agent.
    #[must_use]
    pub fn resources(&self) -> ToolResources {
        ToolResources {
            code_interpreter: Some(CodeInterpreterResource {
                file_ids: self.file_ids.clone(),
            }),
        }
    }
}

/// An agent on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Agent identifier.
    pub id: String,
    /// Object type, always `assistant`.
    #[serde(default)]
    pub object: String,
    /// Creation time (unix seconds).
    #[serde(default)]
    pub created_at: i64,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Model deployment.
    pub model: String,
    /// System instructions.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Enabled tools.
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Tool resources.
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Request body for creating an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAgentRequest {
    /// Model deployment.
    pub model: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// System instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Enabled tools.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Tool resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

impl CreateAgentRequest {
    /// Creates a request for the given model deployment.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: None,
            description: None,
            instructions: None,
            tools: Vec::new(),
            tool_resources: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Enables the code interpreter with its bound files.
    #[must_use]
    pub fn with_code_interpreter(mut self, tool: &CodeInterpreterTool) -> Self {
        self.tools.extend(tool.definitions());
        self.tool_resources = Some(tool.resources());
        self
    }
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentThread {
    /// Thread identifier.
    pub id: String,
    /// Object type, always `thread`.
    #[serde(default)]
    pub object: String,
    /// Creation time (unix seconds).
    #[serde(default)]
    pub created_at: i64,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// End user.
    User,
    /// The agent.
    #[serde(alias = "agent")]
    Assistant,
    /// Value not known to this client.
    #[serde(other)]
    Unknown,
}

/// Text part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageText {
    /// The text.
    pub value: String,
    /// Citations and file path annotations, kept raw.
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

/// Reference to an image file produced by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFileRef {
    /// Identifier of the image file.
    pub file_id: String,
}

/// One content part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Text content.
    Text {
        /// Text payload.
        text: MessageText,
    },
    /// Image file content.
    ImageFile {
        /// Image file reference.
        image_file: ImageFileRef,
    },
    /// Content type not known to this client.
    #[serde(other)]
    Unknown,
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    /// Attached file.
    pub file_id: String,
    /// Tools the file is made available to.
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// A message in a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message identifier.
    pub id: String,
    /// Object type, always `thread.message`.
    #[serde(default)]
    pub object: String,
    /// Creation time (unix seconds).
    #[serde(default)]
    pub created_at: i64,
    /// Owning thread.
    pub thread_id: String,
    /// Author.
    pub role: MessageRole,
    /// Content parts in order.
    #[serde(default)]
    pub content: Vec<MessageContent>,
    /// Agent that produced the message, if any.
    #[serde(default)]
    pub assistant_id: Option<String>,
    /// Run that produced the message, if any.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Attached files.
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
}

impl ThreadMessage {
    /// Image file references in content order.
    pub fn image_contents(&self) -> impl Iterator<Item = &ImageFileRef> {
        self.content.iter().filter_map(|part| match part {
            MessageContent::ImageFile { image_file } => Some(image_file),
            _ => None,
        })
    }

    /// Text parts in content order.
    pub fn text_contents(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            _ => None,
        })
    }
}

/// Request body for appending a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMessageRequest {
    /// Author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
    /// Attached files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,
}

impl CreateMessageRequest {
    /// A user-authored text message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// State of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting to start.
    Queued,
    /// Executing.
    InProgress,
    /// Waiting for client-side tool outputs.
    RequiresAction,
    /// Being cancelled.
    Cancelling,
    /// Cancelled.
    Cancelled,
    /// Failed, see `last_error`.
    Failed,
    /// Finished successfully.
    Completed,
    /// Timed out on the platform.
    Expired,
    /// Ended early, e.g. token limit.
    Incomplete,
    /// Value not known to this client.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling should stop. Unknown states stop polling too.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::Queued | Self::InProgress | Self::RequiresAction | Self::Cancelling
        )
    }
}

/// Error reported for a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// A run of an agent on a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRun {
    /// Run identifier.
    pub id: String,
    /// Object type, always `thread.run`.
    #[serde(default)]
    pub object: String,
    /// Thread the run executes on.
    pub thread_id: String,
    /// Agent executing the run.
    pub assistant_id: String,
    /// Current state.
    pub status: RunStatus,
    /// Error for the `failed` state.
    #[serde(default)]
    pub last_error: Option<RunError>,
    /// Creation time (unix seconds).
    #[serde(default)]
    pub created_at: i64,
    /// Model used.
    #[serde(default)]
    pub model: Option<String>,
}

/// Request body for creating a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRunRequest {
    /// Agent to execute.
    pub assistant_id: String,
    /// Overrides the agent's instructions for this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Appended to the agent's instructions for this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
}

impl CreateRunRequest {
    /// Runs the given agent with its own instructions.
    #[must_use]
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            instructions: None,
            additional_instructions: None,
        }
    }
}

/// Sort order for list calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl ListOrder {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Paging parameters for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Page size (1-100).
    pub limit: Option<u32>,
    /// Sort order.
    pub order: Option<ListOrder>,
    /// Cursor: return items after this id.
    pub after: Option<String>,
    /// Cursor: return items before this id.
    pub before: Option<String>,
}

impl ListQuery {
    /// Query pairs to append to the request URL.
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_owned()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        pairs
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Object type, always `list`.
    #[serde(default)]
    pub object: String,
    /// Items of this page.
    pub data: Vec<T>,
    /// Id of the first item.
    #[serde(default)]
    pub first_id: Option<String>,
    /// Id of the last item, used as the next `after` cursor.
    #[serde(default)]
    pub last_id: Option<String>,
    /// Whether more pages exist.
    #[serde(default)]
    pub has_more: bool,
}
