//! Agents client configuration.

use std::time::Duration;

/// Configuration for the agents client.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Project endpoint, e.g. `https://<resource>.services.ai.azure.com/api/projects/<project>`.
    pub endpoint: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Token scope requested from the credential.
    pub scope: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Delay between status polls for files and runs.
    pub poll_interval: Duration,
}

impl AgentsConfig {
    /// Default API version.
    pub const DEFAULT_API_VERSION: &'static str = "v1";
    /// Default token scope.
    pub const DEFAULT_SCOPE: &'static str = "https://ai.azure.com/.default";
    /// Default polling interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a new configuration for the given project endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_version: Self::DEFAULT_API_VERSION.to_owned(),
            scope: Self::DEFAULT_SCOPE.to_owned(),
            timeout_secs: Some(120),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the token scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = AgentsConfig::new("https://example.com/api/projects/p");
        assert_eq!(config.api_version, AgentsConfig::DEFAULT_API_VERSION);
        assert_eq!(config.scope, AgentsConfig::DEFAULT_SCOPE);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_builder() {
        let config = AgentsConfig::new("https://example.com")
            .with_api_version("2025-05-15-preview")
            .with_timeout(30)
            .with_poll_interval(Duration::from_millis(250));

        assert_eq!(config.api_version, "2025-05-15-preview");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }
}
