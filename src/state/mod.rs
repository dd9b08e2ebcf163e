//! # Setup State
//!
//! Durable record of workflow progress and created-resource identifiers,
//! keyed by demo-package identity. State transitions are plain in-memory
//! mutations; persistence is an explicit, separate step through
//! [`store::StateStore`] so callers control exactly when progress becomes
//! durable.

pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::ResourceRole;
use crate::orchestration::steps::SetupStep;

pub use store::StateStore;

/// Status of one setup step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has not been attempted
    #[default]
    NotStarted,
    /// Step is currently executing
    InProgress,
    /// Step finished successfully
    Completed,
    /// Step failed; resume will retry it
    Failed,
}

impl StepStatus {
    /// Check if this status satisfies the next step's dependency
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if this is an error status that resume may retry
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

/// Status of the whole setup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
    /// All created resources were deleted; step history is retained
    CleanedUp,
}

impl OverallStatus {
    /// Check if there is nothing left to clean up
    pub fn is_cleaned_up(&self) -> bool {
        matches!(self, Self::CleanedUp)
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::CleanedUp => write!(f, "cleaned_up"),
        }
    }
}

/// Per-step record: status plus completion/error bookkeeping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepRecord {
    pub status: StepStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Durable setup state for one demo package.
///
/// Unknown fields are ignored on load and missing fields default-initialize,
/// so older and newer tool versions can read each other's files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupState {
    pub package_name: String,
    pub workspace_id: String,
    pub overall_status: OverallStatus,

    /// Step name → record. Only steps that have been touched appear here.
    pub steps: BTreeMap<String, StepRecord>,

    /// Logical resource role → platform-assigned identifier.
    /// Populated only after a successful creation (or adoption) call.
    pub resources: BTreeMap<ResourceRole, String>,

    pub updated_at: DateTime<Utc>,
}

impl Default for SetupState {
    fn default() -> Self {
        Self {
            package_name: String::new(),
            workspace_id: String::new(),
            overall_status: OverallStatus::NotStarted,
            steps: BTreeMap::new(),
            resources: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

impl SetupState {
    /// Fresh state for a package that has never been set up
    pub fn new(package_name: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            workspace_id: workspace_id.into(),
            ..Self::default()
        }
    }

    /// Current status of a step (`NotStarted` when never touched)
    pub fn step_status(&self, step: SetupStep) -> StepStatus {
        self.steps
            .get(step.name())
            .map(|record| record.status)
            .unwrap_or_default()
    }

    /// Check whether a step is durably complete
    pub fn is_step_complete(&self, step: SetupStep) -> bool {
        self.step_status(step).is_complete()
    }

    /// Record of a step, if it has been touched
    pub fn step_record(&self, step: SetupStep) -> Option<&StepRecord> {
        self.steps.get(step.name())
    }

    /// First failed step in pipeline order, if any
    pub fn failed_step(&self) -> Option<(SetupStep, &StepRecord)> {
        SetupStep::ALL.iter().find_map(|step| {
            self.steps
                .get(step.name())
                .filter(|record| record.status.is_failed())
                .map(|record| (*step, record))
        })
    }

    /// Transition a step's status.
    ///
    /// In-memory only; callers persist through [`StateStore::save`] at the
    /// transition points that must be durable.
    pub fn mark_step(&mut self, step: SetupStep, status: StepStatus) {
        let record = self.steps.entry(step.name().to_string()).or_default();
        record.status = status;
        match status {
            StepStatus::Completed => {
                record.completed_at = Some(Utc::now());
                record.error = None;
            }
            StepStatus::InProgress | StepStatus::NotStarted => {
                record.error = None;
            }
            StepStatus::Failed => {}
        }
        self.updated_at = Utc::now();
    }

    /// Transition a step to `Failed`, capturing the error summary
    pub fn mark_step_failed(&mut self, step: SetupStep, error: impl Into<String>) {
        let record = self.steps.entry(step.name().to_string()).or_default();
        record.status = StepStatus::Failed;
        record.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Record a created (or adopted) resource identifier
    pub fn record_resource(&mut self, role: ResourceRole, id: impl Into<String>) {
        self.resources.insert(role, id.into());
        self.updated_at = Utc::now();
    }

    /// Platform identifier recorded for a role, if any
    pub fn resource(&self, role: ResourceRole) -> Option<&str> {
        self.resources.get(&role).map(String::as_str)
    }

    /// Clear the resource map after cleanup, retaining step history for audit
    pub fn mark_cleaned_up(&mut self) {
        self.resources.clear();
        self.overall_status = OverallStatus::CleanedUp;
        self.updated_at = Utc::now();
    }

    /// Set the overall run status
    pub fn set_overall_status(&mut self, status: OverallStatus) {
        self.overall_status = status;
        self.updated_at = Utc::now();
    }
}
