//! File upload, download and deletion.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

use super::client::{AgentsClient, SERVICE};
use super::types::{DeletionStatus, FileInfo, FilePurpose, FileStatus};

impl AgentsClient {
    /// Upload a local file.
    ///
    /// The returned file may still be processing; see
    /// [`upload_file_and_poll`](Self::upload_file_and_poll).
    pub async fn upload_file(&self, path: &Path, purpose: FilePurpose) -> Result<FileInfo> {
        let contents = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map_or_else(|| "upload".to_owned(), |name| name.to_string_lossy().into_owned());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let file_part = Part::bytes(contents)
            .file_name(filename)
            .mime_str(mime.essence_str())
            .map_err(|e| ServiceError::internal(format!("Invalid MIME type: {e}")))?;

        let form = Form::new()
            .text("purpose", purpose.as_str())
            .part("file", file_part);

        let request = self.request(Method::POST, self.url(&["files"])).await?;
        let file: FileInfo = self.execute_json(request.multipart(form)).await?;
        debug!(file_id = %file.id, status = ?file.status, "uploaded file");
        Ok(file)
    }

    /// Retrieve file metadata.
    pub async fn get_file(&self, file_id: &str) -> Result<FileInfo> {
        let request = self.request(Method::GET, self.url(&["files", file_id])).await?;
        self.execute_json(request).await
    }

    /// Upload a local file and wait until the platform has processed it.
    pub async fn upload_file_and_poll(&self, path: &Path, purpose: FilePurpose) -> Result<FileInfo> {
        let file = self.upload_file(path, purpose).await?;
        self.wait_for_file(file).await
    }

    /// Poll an uploaded file until processing ends.
    ///
    /// A file whose processing failed is an error; it is not deleted.
    pub async fn wait_for_file(&self, mut file: FileInfo) -> Result<FileInfo> {
        while file.status.is_some_and(FileStatus::is_in_progress) {
            tokio::time::sleep(self.config.poll_interval).await;
            file = self.get_file(&file.id).await?;
            debug!(file_id = %file.id, status = ?file.status, "polled file");
        }

        if file.status == Some(FileStatus::Error) {
            let details = file.status_details.as_deref().unwrap_or("no details");
            return Err(ServiceError::service(
                SERVICE,
                format!("processing of file {} failed: {details}", file.id),
            )
            .into());
        }

        info!(file_id = %file.id, filename = %file.filename, "file ready");
        Ok(file)
    }

    /// Download the content of a file.
    pub async fn file_content(&self, file_id: &str) -> Result<Bytes> {
        let request = self
            .request(Method::GET, self.url(&["files", file_id, "content"]))
            .await?;
        let response = self.execute(request).await?;
        Ok(response.bytes().await.map_err(ServiceError::from)?)
    }

    /// Download a file and write it to `target`, creating parent directories.
    pub async fn save_file(&self, file_id: &str, target: &Path) -> Result<PathBuf> {
        let content = self.file_content(file_id).await?;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, &content).await?;

        debug!(file_id, path = %target.display(), bytes = content.len(), "saved file");
        Ok(target.to_path_buf())
    }

    /// Delete a file.
    pub async fn delete_file(&self, file_id: &str) -> Result<DeletionStatus> {
        let request = self.request(Method::DELETE, self.url(&["files", file_id])).await?;
        let status: DeletionStatus = self.execute_json(request).await?;
        debug!(file_id, deleted = status.deleted, "deleted file");
        Ok(status)
    }
}
