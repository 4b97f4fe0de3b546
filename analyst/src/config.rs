//! Environment-driven settings.
//!
//! All four variables are required and have no defaults:
//!
//! - `PROJECT_ENDPOINT` - agent platform project endpoint URL
//! - `BLOB_STORAGE_CONNECTION_STRING` - storage account connection string
//! - `BLOB_STORAGE_CONTAINER_NAME` - container receiving generated images
//! - `MODEL_DEPLOYMENT_NAME` - model deployment used when creating the agent

use std::fmt;

use crate::error::{ConfigError, Result};

/// Agent platform endpoint variable.
pub const PROJECT_ENDPOINT: &str = "PROJECT_ENDPOINT";
/// Storage connection string variable.
pub const BLOB_STORAGE_CONNECTION_STRING: &str = "BLOB_STORAGE_CONNECTION_STRING";
/// Target container variable.
pub const BLOB_STORAGE_CONTAINER_NAME: &str = "BLOB_STORAGE_CONTAINER_NAME";
/// Model deployment variable.
pub const MODEL_DEPLOYMENT_NAME: &str = "MODEL_DEPLOYMENT_NAME";

/// Required variables in lookup order.
pub const REQUIRED_VARS: [&str; 4] = [
    PROJECT_ENDPOINT,
    BLOB_STORAGE_CONNECTION_STRING,
    BLOB_STORAGE_CONTAINER_NAME,
    MODEL_DEPLOYMENT_NAME,
];

/// Settings for one analysis run.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Agent platform project endpoint.
    pub project_endpoint: String,
    /// Storage account connection string. Contains secrets.
    pub blob_connection_string: String,
    /// Container that receives generated images.
    pub container_name: String,
    /// Model deployment name for the agent.
    pub model_deployment_name: String,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, calling it exactly once per variable.
    ///
    /// Absent and blank values are both reported as missing.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut require = |var: &str| -> Result<String> {
            match lookup(var) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
                _ => Err(ConfigError::missing(var).into()),
            }
        };

        Ok(Self {
            project_endpoint: require(PROJECT_ENDPOINT)?,
            blob_connection_string: require(BLOB_STORAGE_CONNECTION_STRING)?,
            container_name: require(BLOB_STORAGE_CONTAINER_NAME)?,
            model_deployment_name: require(MODEL_DEPLOYMENT_NAME)?,
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("project_endpoint", &self.project_endpoint)
            .field("blob_connection_string", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("model_deployment_name", &self.model_deployment_name)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Error;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (PROJECT_ENDPOINT, "https://res.services.ai.azure.com/api/projects/p".to_owned()),
            (
                BLOB_STORAGE_CONNECTION_STRING,
                "AccountName=acct;AccountKey=a2V5".to_owned(),
            ),
            (BLOB_STORAGE_CONTAINER_NAME, "charts".to_owned()),
            (MODEL_DEPLOYMENT_NAME, "gpt-4o".to_owned()),
        ])
    }

    #[test]
    fn reads_all_variables() {
        let env = full_env();
        let settings = Settings::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(settings.container_name, "charts");
        assert_eq!(settings.model_deployment_name, "gpt-4o");
        assert!(settings.project_endpoint.starts_with("https://"));
    }

    #[test]
    fn each_variable_read_once() {
        let env = full_env();
        let mut seen: Vec<String> = Vec::new();
        Settings::from_lookup(|k| {
            seen.push(k.to_owned());
            env.get(k).cloned()
        })
        .unwrap();

        assert_eq!(seen, REQUIRED_VARS.map(str::to_owned).to_vec());
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        for var in REQUIRED_VARS {
            let mut env = full_env();
            env.remove(var);
            let err = Settings::from_lookup(|k| env.get(k).cloned()).unwrap_err();
            match err {
                Error::Config(ConfigError::Missing { var: missing }) => assert_eq!(missing, var),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn blank_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert(MODEL_DEPLOYMENT_NAME, "   ".to_owned());
        let err = Settings::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains(MODEL_DEPLOYMENT_NAME));
    }

    #[test]
    fn debug_redacts_connection_string() {
        let env = full_env();
        let settings = Settings::from_lookup(|k| env.get(k).cloned()).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("AccountKey"));
        assert!(debug.contains("<redacted>"));
    }
}
