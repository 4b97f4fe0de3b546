//! Unified error types for the analyst crate.
//!
//! This module provides the error hierarchy covering:
//! - Configuration errors (missing or malformed settings)
//! - Remote service errors (agent platform, blob storage, identity)
//! - Local I/O errors

use std::fmt;

/// Result type alias for analyst operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the analyst crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote service error.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the service error kind, if this is a service error.
    #[must_use]
    pub const fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            Self::Service(err) => Some(err.kind),
            _ => None,
        }
    }
}

/// Error raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required environment variable is absent or blank.
    #[error("required environment variable `{var}` is not set")]
    Missing {
        /// Name of the variable.
        var: String,
    },

    /// A value is present but malformed.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl ConfigError {
    /// Create a missing-variable error.
    #[must_use]
    pub fn missing(var: impl Into<String>) -> Self {
        Self::Missing { var: var.into() }
    }

    /// Create an invalid-value error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }
}

/// Error type for remote service operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ServiceError {
    /// The error kind.
    pub kind: ServiceErrorKind,
    /// The service name (e.g., "agents", "storage", "identity").
    pub service: Option<String>,
    /// Additional error message.
    pub message: String,
    /// Optional error code from the service.
    pub code: Option<String>,
}

/// Categories of service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// The addressed resource does not exist.
    NotFound,
    /// The request conflicts with existing state (e.g., blob already exists).
    Conflict,
    /// Rate limit exceeded.
    RateLimited,
    /// HTTP status error with an unrecognized body.
    HttpStatus,
    /// Network or connection error.
    Network,
    /// Response format error.
    ResponseFormat,
    /// Service-reported error with a code.
    Service,
    /// Internal error.
    Internal,
}

impl ServiceError {
    /// Create an authentication error.
    #[must_use]
    pub fn auth(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Auth,
            service: Some(service.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::NotFound,
            service: Some(service.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Conflict,
            service: Some(service.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(service: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::RateLimited,
            service: Some(service.into()),
            message: "Rate limit exceeded. Please retry after some time.".into(),
            code: None,
        }
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::HttpStatus,
            service: None,
            message: format!("HTTP {status}: {}", body.into()),
            code: Some(status.to_string()),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Network,
            service: None,
            message: message.into(),
            code: None,
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::ResponseFormat,
            service: None,
            message: format!("Expected {}, got {}", expected.into(), got.into()),
            code: None,
        }
    }

    /// Create a service-reported error.
    #[must_use]
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Service,
            service: Some(service.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Internal,
            service: None,
            message: message.into(),
            code: None,
        }
    }

    /// Attach an error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(service) = &self.service {
            write!(f, "[{service}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}
