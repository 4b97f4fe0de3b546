//! Agent platform client.
//!
//! This module provides a client for the agent platform's REST API, supporting:
//! - File upload (with processing poll), download and deletion
//! - Agent creation and deletion
//! - Threads and messages
//! - Runs, polled to completion

mod assistants;
mod client;
mod config;
mod files;
mod runs;
mod service;
mod threads;
pub mod types;

pub use client::AgentsClient;
pub use config::AgentsConfig;
pub use service::AgentService;
pub use types::{
    Agent, AgentThread, CodeInterpreterTool, CreateAgentRequest, CreateMessageRequest,
    DeletionStatus, FileInfo, FilePurpose, FileStatus, ImageFileRef, ListOrder, ListQuery,
    ListResponse, MessageContent, MessageRole, RunStatus, ThreadMessage, ThreadRun,
};
