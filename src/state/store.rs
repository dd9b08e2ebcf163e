//! # State Store
//!
//! File persistence for [`SetupState`] with crash-safe overwrite semantics:
//! the new document is written to a temp file in the same directory, the
//! previous file is copied to a `.backup` suffix, and the temp file is then
//! renamed over the target. A crash mid-write never destroys the last good
//! state.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::STATE_BACKUP_SUFFIX;
use crate::error::{SetupError, SetupResult};
use crate::state::SetupState;

/// Handle to one package's state file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store for the given state file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup file path (previous state before the last overwrite)
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        name.push_str(STATE_BACKUP_SUFFIX);
        self.path.with_file_name(name)
    }

    /// Whether a state file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the state file.
    ///
    /// A missing file is [`SetupError::StateNotFound`]; an unreadable or
    /// unparsable file is [`SetupError::StateCorruption`] so callers can
    /// recommend recovery instead of silently restarting.
    pub fn load(&self) -> SetupResult<SetupState> {
        if !self.path.exists() {
            return Err(SetupError::StateNotFound);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            SetupError::StateCorruption {
                path: self.path.clone(),
                detail: e.to_string(),
            }
        })?;
        serde_yaml::from_str(&content).map_err(|e| SetupError::StateCorruption {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }

    /// Load the state file, mapping "never run" to `None`.
    /// Corruption still surfaces as an error.
    pub fn try_load(&self) -> SetupResult<Option<SetupState>> {
        match self.load() {
            Ok(state) => Ok(Some(state)),
            Err(SetupError::StateNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist the state atomically, backing up the previous file first.
    pub fn save(&self, state: &SetupState) -> SetupResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let serialized = serde_yaml::to_string(state)?;
        let temp_path = self.path.with_extension("yaml.tmp");
        std::fs::write(&temp_path, &serialized)?;

        if self.path.exists() {
            if let Err(e) = std::fs::copy(&self.path, self.backup_path()) {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "could not write state backup before overwrite"
                );
            }
        }

        std::fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), "state persisted");
        Ok(())
    }

    /// Remove the state file and its backup (used by `--clear-state`)
    pub fn clear(&self) -> SetupResult<()> {
        for path in [self.path.clone(), self.backup_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
