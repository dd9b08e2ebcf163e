//! # Setup Error Types
//!
//! Structured error handling for demo package setup, cleanup, and recovery
//! using thiserror instead of `Box<dyn Error>` patterns.

use std::path::PathBuf;

use thiserror::Error;

use crate::clients::PlatformError;
use crate::orchestration::steps::SetupStep;
use crate::validation::ValidationReport;

/// Result type alias for setup operations
pub type SetupResult<T> = Result<T, SetupError>;

/// Comprehensive error types for setup orchestration
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Package validation failed: {} error(s)", report.errors.len())]
    Validation { report: ValidationReport },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: SetupStep, message: String },

    #[error("Resource '{name}' already exists and the on-existing policy is 'fail'")]
    ResourceConflict { name: String },

    #[error("Resource not found: {role} '{id}'")]
    ResourceNotFound { role: String, id: String },

    #[error("State file is corrupt: {}: {detail}", path.display())]
    StateCorruption { path: PathBuf, detail: String },

    #[error("No setup state recorded for this package")]
    StateNotFound,

    #[error("Refusing to overwrite existing state without --force")]
    StateExists,

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Invalid demo package: {message}")]
    Package { message: String },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SetupError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a step failure error
    pub fn step_failed(step: SetupStep, message: impl Into<String>) -> Self {
        Self::StepFailed {
            step,
            message: message.into(),
        }
    }

    /// Create a resource-not-found error
    pub fn resource_not_found(role: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            role: role.into(),
            id: id.into(),
        }
    }

    /// Create a package error
    pub fn package(message: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
        }
    }

    /// Process exit code for the CLI layer.
    ///
    /// 0 success, 1 general error, 2 validation error, 3 auth error,
    /// 4 resource-not-found, 5 user-cancelled.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => 2,
            Self::Authentication { .. } => 3,
            Self::Platform(PlatformError::Unauthorized { .. }) => 3,
            Self::ResourceNotFound { .. } => 4,
            Self::Platform(PlatformError::NotFound { .. }) => 4,
            Self::Cancelled => 5,
            _ => 1,
        }
    }

    /// Suggested follow-up command shown to the user after a failure
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            Self::StepFailed { .. } | Self::Platform(_) => {
                Some("re-run with `setup <path> --resume` to retry the failed step")
            }
            Self::StateCorruption { .. } => {
                Some("run `recover <path>` to rebuild state from the platform")
            }
            Self::StateNotFound => {
                Some("run `recover <path>`, or `cleanup <path> --force-by-name` if state is lost")
            }
            Self::Authentication { .. } => {
                Some("check the auth token environment variable named in your config")
            }
            _ => None,
        }
    }
}
