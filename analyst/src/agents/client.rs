//! Agent platform HTTP client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::credential::{AccessToken, TokenCredential};
use crate::error::{ConfigError, Result, ServiceError};

use super::config::AgentsConfig;

/// Service name used in errors.
pub(crate) const SERVICE: &str = "agents";

/// Tokens closer than this to expiry are refreshed.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Platform error response.
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Platform error details.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

/// Agent platform client.
///
/// Cloning is cheap; clones share the HTTP pool and the token cache.
#[derive(Debug, Clone)]
pub struct AgentsClient {
    pub(crate) config: Arc<AgentsConfig>,
    pub(crate) client: Client,
    base_url: Url,
    credential: Arc<dyn TokenCredential>,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl AgentsClient {
    /// Create a new client with the given configuration and credential.
    pub fn new(config: AgentsConfig, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        let mut base_url = Url::parse(config.endpoint.trim())
            .map_err(|e| ConfigError::invalid(format!("project endpoint `{}`: {e}", config.endpoint)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::invalid(format!(
                "project endpoint `{}` is not a base URL",
                config.endpoint
            ))
            .into());
        }
        let trimmed = base_url.path().trim_end_matches('/').to_owned();
        base_url.set_path(&trimmed);

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| ServiceError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
            base_url,
            credential,
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Get the project endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build a URL below the endpoint with the `api-version` query set.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        url
    }

    /// Return a cached token, refreshing it when close to expiry.
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expiring(TOKEN_REFRESH_MARGIN) {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.credential.get_token(&[self.config.scope.as_str()]).await?;
        let value = fresh.token.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Build an authorized request.
    pub(crate) async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.bearer_token().await?;
        debug!(%method, %url, "agents request");
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}")))
    }

    /// Send a request and return the successful response.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(ServiceError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        Ok(response)
    }

    /// Send a request and decode the JSON body.
    pub(crate) async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let response_text = response.text().await.map_err(ServiceError::from)?;
        serde_json::from_str(&response_text).map_err(|e| {
            ServiceError::response_format(
                format!("valid {} response", std::any::type_name::<T>()),
                format!("parse error: {e}, response: {response_text}"),
            )
            .into()
        })
    }

    /// Parse an error response from the platform.
    pub(crate) fn parse_error(status: u16, body: &str) -> ServiceError {
        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            let error = error_response.error;
            let code = error.code.or(error.error_type);

            let err = match status {
                401 | 403 => ServiceError::auth(SERVICE, error.message),
                404 => ServiceError::not_found(SERVICE, error.message),
                409 => ServiceError::conflict(SERVICE, error.message),
                429 => return ServiceError::rate_limited(SERVICE),
                _ => ServiceError::service(SERVICE, error.message),
            };
            return match code {
                Some(code) => err.with_code(code),
                None => err,
            };
        }

        ServiceError::http_status(status, body.to_owned())
    }
}
