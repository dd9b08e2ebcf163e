//! # Platform Error Types
//!
//! Typed errors for the resource-service clients, split into transient
//! errors (worth retrying with backoff) and permanent errors (propagated
//! immediately).

use std::time::Duration;

use thiserror::Error;

/// Result type alias for platform client operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors raised by resource-service clients
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("rate limited{}", retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    #[error("operation '{operation}' timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("long-running operation ended in state '{state}': {message}")]
    OperationFailed { state: String, message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("conflict: '{name}' already exists")]
    Conflict { name: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("platform internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(name: impl Into<String>) -> Self {
        Self::Conflict { name: name.into() }
    }

    /// Create an invalid-request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error may succeed on retry.
    ///
    /// Rate limits, timeouts, connection failures, and 5xx-class internal
    /// errors are transient; everything else is permanent and propagates
    /// without retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Timeout { .. }
                | Self::Connection { .. }
                | Self::Internal { .. }
        )
    }

    /// Server-provided retry hint, when present
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("http request", 0)
        } else if err.is_connect() {
            Self::connection(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}
