//! # Demoforge Configuration System
//!
//! YAML-based configuration with environment-variable overrides. All values
//! have explicit defaults; a missing config file is not an error, but a
//! malformed one is. Authentication tokens are read from the environment at
//! call time and never persisted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SetupError, SetupResult};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "demoforge.yaml";

/// Root configuration structure mirroring demoforge.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoforgeConfig {
    /// Target platform connection settings
    pub platform: PlatformConfig,

    /// Retry and backoff configuration for transient platform errors
    pub backoff: BackoffConfig,

    /// Orchestration behavior toggles
    pub behavior: BehaviorConfig,
}

/// Platform connection and polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL of the platform REST API
    pub base_url: String,

    /// Workspace every resource is created in (CLI --workspace-id overrides)
    pub workspace_id: String,

    /// Name of the environment variable holding the bearer token
    pub auth_token_env: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Delay between long-running-operation polls in milliseconds
    pub poll_interval_ms: u64,

    /// Total budget for polling one operation to a terminal state
    pub poll_timeout_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            workspace_id: String::new(),
            auth_token_env: "DEMOFORGE_TOKEN".to_string(),
            request_timeout_ms: 30_000,
            poll_interval_ms: 2_000,
            poll_timeout_ms: 300_000,
        }
    }
}

/// Retry and backoff configuration applied at the client layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Policy applied when a creation step finds a same-named resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExisting {
    /// Reuse the existing resource's ID (default)
    Adopt,
    /// Escalate the conflict as an error
    Fail,
}

/// Orchestration behavior toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Adopt-vs-fail policy for already-existing resources.
    ///
    /// Defaults to `adopt`: a same-named resource found during a creation
    /// step is reused rather than treated as a conflict.
    pub on_existing: OnExisting,

    /// Skip uploading files already present with matching size and checksum
    pub skip_existing_uploads: bool,

    /// Optional directory for JSON log files
    pub log_dir: Option<PathBuf>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            on_existing: OnExisting::Adopt,
            skip_existing_uploads: true,
            log_dir: None,
        }
    }
}

impl DemoforgeConfig {
    /// Load configuration from an explicit path, or from
    /// [`DEFAULT_CONFIG_FILE`] when present, falling back to defaults.
    /// Environment overrides (`DEMOFORGE_BASE_URL`, `DEMOFORGE_WORKSPACE_ID`)
    /// are applied last.
    pub fn load(path: Option<&Path>) -> SetupResult<Self> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(base_url) = std::env::var("DEMOFORGE_BASE_URL") {
            config.platform.base_url = base_url;
        }
        if let Ok(workspace_id) = std::env::var("DEMOFORGE_WORKSPACE_ID") {
            config.platform.workspace_id = workspace_id;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> SetupResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SetupError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            SetupError::configuration(format!("invalid config {}: {e}", path.display()))
        })
    }

    fn validate(&self) -> SetupResult<()> {
        if self.platform.base_url.is_empty() {
            return Err(SetupError::configuration("platform.base_url must not be empty"));
        }
        if self.backoff.max_attempts == 0 {
            return Err(SetupError::configuration("backoff.max_attempts must be at least 1"));
        }
        if self.backoff.backoff_multiplier < 1.0 {
            return Err(SetupError::configuration(
                "backoff.backoff_multiplier must be >= 1.0",
            ));
        }
        Ok(())
    }

    /// Resolve the bearer token from the configured environment variable
    pub fn auth_token(&self) -> SetupResult<String> {
        std::env::var(&self.platform.auth_token_env).map_err(|_| {
            SetupError::authentication(format!(
                "environment variable {} is not set",
                self.platform.auth_token_env
            ))
        })
    }

    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.platform.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DemoforgeConfig::default();
        assert_eq!(config.backoff.max_attempts, 3);
        assert_eq!(config.behavior.on_existing, OnExisting::Adopt);
        assert!(config.behavior.skip_existing_uploads);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
platform:
  workspace_id: ws-123
"#;
        let config: DemoforgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.platform.workspace_id, "ws-123");
        assert_eq!(config.platform.request_timeout_ms, 30_000);
        assert_eq!(config.backoff.base_delay_ms, 1_000);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let yaml = r#"
platform:
  workspace_id: ws-123
future_section:
  something: true
"#;
        let config: DemoforgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.platform.workspace_id, "ws-123");
    }

    #[test]
    fn test_on_existing_round_trip() {
        let yaml = "behavior:\n  on_existing: fail\n";
        let config: DemoforgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.behavior.on_existing, OnExisting::Fail);
    }

    #[test]
    fn test_missing_token_is_authentication_error() {
        let mut config = DemoforgeConfig::default();
        config.platform.auth_token_env = "DEMOFORGE_TEST_TOKEN_UNSET".to_string();
        let err = config.auth_token().unwrap_err();
        assert!(matches!(err, SetupError::Authentication { .. }));
    }
}
