//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use analyst::prelude::*;
//! ```

pub use crate::agents::{
    Agent, AgentService, AgentThread, AgentsClient, AgentsConfig, CodeInterpreterTool,
    CreateAgentRequest, CreateMessageRequest, FileInfo, FilePurpose, FileStatus, MessageContent,
    MessageRole, RunStatus, ThreadMessage, ThreadRun,
};
pub use crate::config::Settings;
pub use crate::credential::{
    AccessToken, AzureCliCredential, ClientSecretCredential, DefaultCredential,
    StaticTokenCredential, TokenCredential,
};
pub use crate::error::{ConfigError, Error, Result, ServiceError, ServiceErrorKind};
pub use crate::storage::{
    BlobServiceClient, BlobStore, BlobUploadResult, ContainerClient, UploadOptions,
};
pub use crate::workflow::{
    Analysis, AnalysisOptions, AnalysisReport, CleanupPolicy, SavedImage,
};
