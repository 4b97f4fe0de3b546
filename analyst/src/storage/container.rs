//! Blob service and container clients.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::error::{ConfigError, Result, ServiceError};

use super::auth;
use super::connection::{ConnectionString, StorageCredential};

/// Service name used in errors.
const SERVICE: &str = "storage";

/// REST API version sent with every request.
pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Options for [`ContainerClient::upload_blob`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Replace an existing blob of the same name.
    pub overwrite: bool,
    /// Content type; guessed from the blob name when unset.
    pub content_type: Option<String>,
}

impl UploadOptions {
    /// Options that replace existing blobs.
    #[must_use]
    pub fn overwrite() -> Self {
        Self {
            overwrite: true,
            content_type: None,
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUploadResult {
    /// Blob name within the container.
    pub name: String,
    /// Blob URL, without credentials.
    pub url: String,
    /// Entity tag of the new blob.
    pub etag: Option<String>,
    /// Last-Modified of the new blob.
    pub last_modified: Option<String>,
}

#[derive(Debug)]
struct Inner {
    client: Client,
    endpoint: Url,
    credential: StorageCredential,
}

/// Client for a storage account's blob service.
#[derive(Debug, Clone)]
pub struct BlobServiceClient {
    inner: Arc<Inner>,
}

impl BlobServiceClient {
    /// Request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Creates a client from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        Self::new(ConnectionString::parse(connection_string)?)
    }

    /// Creates a client from a parsed connection string.
    pub fn new(connection: ConnectionString) -> Result<Self> {
        let client = Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::internal(format!("Failed to create HTTP client: {e}")))?;

        if connection.blob_endpoint.cannot_be_a_base() {
            return Err(ConfigError::invalid("blob endpoint is not a base URL").into());
        }

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                endpoint: connection.blob_endpoint,
                credential: connection.credential,
            }),
        })
    }

    /// Client for one container. No request is made.
    #[must_use]
    pub fn container_client(&self, container: impl Into<String>) -> ContainerClient {
        ContainerClient {
            inner: Arc::clone(&self.inner),
            container: container.into(),
        }
    }
}

/// Client for one blob container.
#[derive(Debug, Clone)]
pub struct ContainerClient {
    inner: Arc<Inner>,
    container: String,
}

impl ContainerClient {
    /// Container name.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container
    }

    /// URL of a blob, without credentials.
    #[must_use]
    pub fn blob_url(&self, blob: &str) -> Url {
        let mut url = self.inner.endpoint.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.container).push(blob);
        }
        url
    }

    /// Uploads `data` as a block blob in a single request.
    ///
    /// Without [`UploadOptions::overwrite`] an existing blob is left untouched
    /// and a conflict error is returned.
    pub async fn upload_blob(
        &self,
        name: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> Result<BlobUploadResult> {
        let blob_url = self.blob_url(name);
        let content_type = options.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_owned()
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ms-date"),
            header_value(&Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string())?,
        );
        headers.insert(
            HeaderName::from_static("x-ms-version"),
            HeaderValue::from_static(STORAGE_API_VERSION),
        );
        headers.insert(
            HeaderName::from_static("x-ms-blob-type"),
            HeaderValue::from_static("BlockBlob"),
        );
        headers.insert(reqwest::header::CONTENT_TYPE, header_value(&content_type)?);
        if !options.overwrite {
            headers.insert(reqwest::header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        }

        let request_url = match &self.inner.credential {
            StorageCredential::SharedKey { account_name, key } => {
                let to_sign = auth::string_to_sign(&Method::PUT, &blob_url, &headers, data.len(), account_name);
                let signature = auth::sign(key, &to_sign)?;
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    header_value(&auth::authorization_header(account_name, &signature))?,
                );
                blob_url.clone()
            }
            StorageCredential::Sas(sas) => {
                let mut url = blob_url.clone();
                url.set_query(Some(sas));
                url
            }
        };

        debug!(container = %self.container, blob = name, bytes = data.len(), overwrite = options.overwrite, "uploading blob");
        let response = self
            .inner
            .client
            .put(request_url)
            .headers(headers)
            .body(data)
            .send()
            .await
            .map_err(ServiceError::from)?;

        let status = response.status();
        if !status.is_success() {
            let code = response
                .headers()
                .get("x-ms-error-code")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, code, &body).into());
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let result = BlobUploadResult {
            name: name.to_owned(),
            url: blob_url.to_string(),
            etag: header("etag"),
            last_modified: header("last-modified"),
        };

        info!(container = %self.container, blob = name, "uploaded blob");
        Ok(result)
    }

    /// Maps a failed storage response to a service error.
    fn parse_error(status: StatusCode, code: Option<String>, body: &str) -> ServiceError {
        let message = code.clone().unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_owned()
            }
        });
        let err = match status {
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ServiceError::conflict(SERVICE, message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::auth(SERVICE, message),
            StatusCode::NOT_FOUND => ServiceError::not_found(SERVICE, message),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                ServiceError::rate_limited(SERVICE)
            }
            _ if code.is_some() => ServiceError::service(SERVICE, message),
            _ => return ServiceError::http_status(status.as_u16(), body.to_owned()),
        };
        match code {
            Some(code) => err.with_code(code),
            None => err,
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ServiceError::internal(format!("invalid header value `{value}`: {e}")).into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;

    fn container(cs: &str) -> ContainerClient {
        BlobServiceClient::from_connection_string(cs)
            .unwrap()
            .container_client("charts")
    }

    #[test]
    fn blob_url_on_account_host() {
        let client = container("AccountName=acct;AccountKey=a2V5");
        assert_eq!(
            client.blob_url("file_1.png").as_str(),
            "https://acct.blob.core.windows.net/charts/file_1.png"
        );
    }

    #[test]
    fn blob_url_on_path_style_endpoint() {
        let client = container("UseDevelopmentStorage=true");
        assert_eq!(
            client.blob_url("a b.png").as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/charts/a%20b.png"
        );
    }

    #[test]
    fn conflict_keeps_error_code() {
        let err = ContainerClient::parse_error(StatusCode::CONFLICT, Some("BlobAlreadyExists".into()), "");
        assert_eq!(err.kind, ServiceErrorKind::Conflict);
        assert_eq!(err.code.as_deref(), Some("BlobAlreadyExists"));
    }

    #[test]
    fn forbidden_is_auth() {
        let err = ContainerClient::parse_error(
            StatusCode::FORBIDDEN,
            Some("AuthenticationFailed".into()),
            "<Error/>",
        );
        assert_eq!(err.kind, ServiceErrorKind::Auth);
    }

    #[test]
    fn unknown_status_without_code() {
        let err = ContainerClient::parse_error(StatusCode::BAD_GATEWAY, None, "upstream");
        assert_eq!(err.kind, ServiceErrorKind::HttpStatus);
    }

    #[test]
    fn upload_options_default_keeps_existing() {
        assert!(!UploadOptions::default().overwrite);
        assert!(UploadOptions::overwrite().overwrite);
    }
}
