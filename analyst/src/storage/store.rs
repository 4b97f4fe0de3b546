//! The storage operation the analysis flow depends on.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

use super::container::{BlobUploadResult, ContainerClient, UploadOptions};

/// Destination for generated artifacts.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `data` as blob `name`.
    async fn upload_blob(
        &self,
        name: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> Result<BlobUploadResult>;
}

#[async_trait]
impl BlobStore for ContainerClient {
    async fn upload_blob(
        &self,
        name: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> Result<BlobUploadResult> {
        Self::upload_blob(self, name, data, options).await
    }
}
