//! # Setup Steps
//!
//! The fixed, ordered pipeline of named setup steps. Step metadata is
//! static: ordinal position, stable name, description, and an implicit
//! dependency on the previous step's completion.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One named, ordered unit of the setup pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    /// Validate the package structure and content
    Validate,
    /// Create (or adopt) the lakehouse
    CreateLakehouse,
    /// Upload tabular data files into the lakehouse
    UploadFiles,
    /// Convert uploaded files into queryable tables
    LoadTables,
    /// Create (or adopt) the eventhouse
    CreateEventhouse,
    /// Upload and ingest time-series files
    IngestData,
    /// Create (or adopt) the ontology from the validated definition
    CreateOntology,
    /// Configure static bindings for every bound entity
    BindStatic,
    /// Configure time-series bindings
    BindTimeseries,
    /// Configure relationship contextualizations
    BindRelationships,
    /// Cross-check platform resources and bindings against recorded state
    Verify,
}

/// Static step metadata
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepDescriptor {
    pub ordinal: u8,
    pub name: &'static str,
    pub description: &'static str,
}

impl SetupStep {
    /// Every step in execution order
    pub const ALL: [SetupStep; 11] = [
        Self::Validate,
        Self::CreateLakehouse,
        Self::UploadFiles,
        Self::LoadTables,
        Self::CreateEventhouse,
        Self::IngestData,
        Self::CreateOntology,
        Self::BindStatic,
        Self::BindTimeseries,
        Self::BindRelationships,
        Self::Verify,
    ];

    /// 1-based position in the pipeline
    pub fn ordinal(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i as u8 + 1)
            .unwrap_or(0)
    }

    /// Stable step name used in state files and `run-step --step`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::CreateLakehouse => "create_lakehouse",
            Self::UploadFiles => "upload_files",
            Self::LoadTables => "load_tables",
            Self::CreateEventhouse => "create_eventhouse",
            Self::IngestData => "ingest_data",
            Self::CreateOntology => "create_ontology",
            Self::BindStatic => "bind_static",
            Self::BindTimeseries => "bind_timeseries",
            Self::BindRelationships => "bind_relationships",
            Self::Verify => "verify",
        }
    }

    /// Human-facing description for status output
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validate => "validate package structure and content",
            Self::CreateLakehouse => "create or adopt the lakehouse",
            Self::UploadFiles => "upload tabular data files",
            Self::LoadTables => "load uploaded files into tables",
            Self::CreateEventhouse => "create or adopt the eventhouse",
            Self::IngestData => "ingest time-series data",
            Self::CreateOntology => "create or adopt the ontology",
            Self::BindStatic => "configure static bindings",
            Self::BindTimeseries => "configure time-series bindings",
            Self::BindRelationships => "configure relationship bindings",
            Self::Verify => "verify platform state against recorded state",
        }
    }

    /// The step whose completion this step depends on
    pub fn depends_on(&self) -> Option<SetupStep> {
        let position = Self::ALL.iter().position(|s| s == self)?;
        if position == 0 {
            None
        } else {
            Some(Self::ALL[position - 1])
        }
    }

    /// Step by 1-based ordinal
    pub fn from_ordinal(ordinal: u8) -> Option<SetupStep> {
        if ordinal == 0 {
            return None;
        }
        Self::ALL.get(ordinal as usize - 1).copied()
    }

    /// Static metadata for this step
    pub fn descriptor(&self) -> StepDescriptor {
        StepDescriptor {
            ordinal: self.ordinal(),
            name: self.name(),
            description: self.description(),
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SetupStep {
    type Err = String;

    /// Accepts a stable step name or a 1-based ordinal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ordinal) = s.parse::<u8>() {
            return Self::from_ordinal(ordinal)
                .ok_or_else(|| format!("step number must be 1..=11, got {ordinal}"));
        }
        Self::ALL
            .iter()
            .find(|step| step.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown step: {s}"))
    }
}
