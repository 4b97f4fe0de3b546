//! Analyst - a data-analysis agent over a hosted agent platform
//!
//! This crate uploads a dataset to an agent platform, asks a code-interpreter
//! agent to chart it, and copies every generated image to blob storage.

pub mod agents;
pub mod config;
pub mod credential;
pub mod error;
pub mod prelude;
pub mod storage;
pub mod workflow;

pub use error::{ConfigError, Error, Result, ServiceError, ServiceErrorKind};
