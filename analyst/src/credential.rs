//! Bearer token credentials for the agent platform.
//!
//! The orchestration treats identity as opaque: anything implementing
//! [`TokenCredential`] can be handed to the agents client. The provided
//! sources cover the common local setups:
//!
//! - [`StaticTokenCredential`] - a pre-issued token
//! - [`ClientSecretCredential`] - service principal via OAuth2 client credentials
//! - [`AzureCliCredential`] - the token of the logged-in `az` CLI user
//! - [`DefaultCredential`] - environment service principal, then Azure CLI

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, ServiceError};

/// Default authority host for client-credential token requests.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

const SERVICE: &str = "identity";

/// An access token and its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The bearer token.
    pub token: String,
    /// When the token stops being valid, if known.
    pub expires_on: Option<SystemTime>,
}

impl AccessToken {
    /// Creates a token without a known expiry.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_on: None,
        }
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expiry(mut self, expires_on: SystemTime) -> Self {
        self.expires_on = Some(expires_on);
        self
    }

    /// Whether the token expires within `margin` from now.
    ///
    /// Tokens without a known expiry never expire.
    #[must_use]
    pub fn is_expiring(&self, margin: Duration) -> bool {
        self.expires_on
            .is_some_and(|expiry| SystemTime::now() + margin >= expiry)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// A source of bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Acquires a token valid for `scopes`.
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}

#[async_trait]
impl<T: TokenCredential + ?Sized> TokenCredential for Arc<T> {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        (**self).get_token(scopes).await
    }
}

/// Returns a fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    /// Wraps a pre-issued bearer token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

/// OAuth2 client-credentials grant for a service principal.
#[derive(Clone)]
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ClientSecretCredential {
    /// Creates a credential for the given tenant and application.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_owned(),
            client: Client::new(),
        }
    }

    /// Creates a credential from environment variables, if all are set.
    ///
    /// Reads from:
    /// - `AZURE_TENANT_ID` - Required tenant
    /// - `AZURE_CLIENT_ID` - Required application id
    /// - `AZURE_CLIENT_SECRET` - Required secret
    /// - `AZURE_AUTHORITY_HOST` - Optional authority host
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let tenant_id = std::env::var("AZURE_TENANT_ID").ok()?;
        let client_id = std::env::var("AZURE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("AZURE_CLIENT_SECRET").ok()?;

        let mut credential = Self::new(tenant_id, client_id, client_secret);
        if let Ok(host) = std::env::var("AZURE_AUTHORITY_HOST") {
            credential = credential.with_authority_host(host);
        }
        Some(credential)
    }

    /// Sets the authority host.
    #[must_use]
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority_host", &self.authority_host)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("scope", &scopes.join(" "))
            .finish();

        let response = self
            .client
            .post(self.token_url())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(ServiceError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(ServiceError::from)?;
        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&text).map_or_else(
                |_| format!("HTTP {}: {text}", status.as_u16()),
                |err| err.error_description.unwrap_or(err.error),
            );
            return Err(ServiceError::auth(SERVICE, message).into());
        }

        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ServiceError::response_format("token response", e.to_string()))?;

        debug!(tenant = %self.tenant_id, "acquired client secret token");
        let token = AccessToken::new(parsed.access_token);
        Ok(match parsed.expires_in {
            Some(secs) => token.with_expiry(SystemTime::now() + Duration::from_secs(secs)),
            None => token,
        })
    }
}

/// Uses the token of the user logged into the `az` CLI.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<u64>,
}

impl AzureCliCredential {
    /// Creates a credential invoking `az`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different executable name or path.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Converts a `.default` scope to the resource the CLI expects.
    fn resource_for(scopes: &[&str]) -> Result<String> {
        match scopes {
            [scope] => Ok(scope.trim_end_matches("/.default").to_owned()),
            _ => Err(ServiceError::auth(SERVICE, "Azure CLI credential requires exactly one scope").into()),
        }
    }

    fn parse_output(stdout: &[u8]) -> Result<AccessToken> {
        let parsed: CliToken = serde_json::from_slice(stdout)
            .map_err(|e| ServiceError::response_format("az token JSON", e.to_string()))?;
        let token = AccessToken::new(parsed.access_token);
        Ok(match parsed.expires_on {
            Some(secs) => token.with_expiry(UNIX_EPOCH + Duration::from_secs(secs)),
            None => token,
        })
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: "az".to_owned(),
        }
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let resource = Self::resource_for(scopes)?;
        let output = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json", "--resource"])
            .arg(&resource)
            .output()
            .await
            .map_err(|e| ServiceError::auth(SERVICE, format!("failed to run `{}`: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::auth(SERVICE, format!("az login required: {}", stderr.trim())).into());
        }

        debug!(%resource, "acquired Azure CLI token");
        Self::parse_output(&output.stdout)
    }
}

/// Tries the environment service principal, then the Azure CLI.
#[derive(Debug, Clone)]
pub struct DefaultCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl DefaultCredential {
    /// Builds the chain from the current environment.
    #[must_use]
    pub fn new() -> Self {
        let mut sources: Vec<Arc<dyn TokenCredential>> = Vec::new();
        if let Some(secret) = ClientSecretCredential::from_env() {
            sources.push(Arc::new(secret));
        }
        sources.push(Arc::new(AzureCliCredential::new()));
        Self { sources }
    }

    /// Builds a chain from explicit sources, tried in order.
    #[must_use]
    pub fn with_sources(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { sources }
    }
}

impl Default for DefaultCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.get_token(scopes).await {
                Ok(token) => return Ok(token),
                Err(err) => {
                    debug!(source = ?source, error = %err, "credential source failed");
                    failures.push(err.to_string());
                }
            }
        }
        Err(ServiceError::auth(
            SERVICE,
            format!("no credential source succeeded: {}", failures.join("; ")),
        )
        .into())
    }
}
