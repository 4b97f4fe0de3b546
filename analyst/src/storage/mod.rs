//! Blob storage client.
//!
//! Just enough of the blob service to persist generated artifacts:
//! - Connection string parsing (account key, SAS, local emulator)
//! - Shared Key request signing
//! - Single-request block blob upload with optional overwrite

mod auth;
mod connection;
mod container;
mod store;

pub use connection::{ConnectionString, StorageCredential};
pub use container::{
    BlobServiceClient, BlobUploadResult, ContainerClient, STORAGE_API_VERSION, UploadOptions,
};
pub use store::BlobStore;
