//! # System Constants and Naming Rules
//!
//! Core constants, enums, and data-driven naming rules that define the
//! operational boundaries of demo package provisioning.
//!
//! Naming rules (pattern, length bound, reserved words) are loaded once at
//! process start and shared immutably.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Relative path of the state directory inside a demo package
pub const STATE_DIR: &str = ".demoforge";

/// State file name within [`STATE_DIR`]
pub const STATE_FILE: &str = "state.yaml";

/// Suffix appended to the previous state file before every overwrite
pub const STATE_BACKUP_SUFFIX: &str = ".backup";

/// Package manifest file name
pub const MANIFEST_FILE: &str = "demo.yaml";

/// Ontology definition file, relative to the package root
pub const ONTOLOGY_FILE: &str = "ontology/ontology.yaml";

/// Bindings descriptor file, relative to the package root
pub const BINDINGS_FILE: &str = "bindings/bindings.yaml";

/// Directory of tabular (static) data files, relative to the package root
pub const DATA_DIR: &str = "data";

/// Directory of time-series data files, relative to the package root
pub const TIMESERIES_DIR: &str = "timeseries";

/// Maximum length of entity, relationship, and property names
pub const MAX_NAME_LENGTH: usize = 64;

/// Scalar data types the platform accepts for ontology properties
pub const SUPPORTED_DATA_TYPES: &[&str] =
    &["string", "int", "long", "double", "float", "bool", "datetime"];

/// Words that may not be used as entity, relationship, or property names.
///
/// These collide with platform query keywords or generated column names.
const RESERVED_WORDS: &[&str] = &[
    "id",
    "key",
    "timestamp",
    "table",
    "select",
    "where",
    "from",
    "join",
    "order",
    "group",
    "by",
    "entity",
    "relationship",
    "property",
    "source",
    "target",
    "type",
    "value",
    "name",
];

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();
static RESERVED_SET: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Naming pattern every entity, relationship, and property name must match
pub fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("naming pattern is a valid regex")
    })
}

/// Check whether a name is in the reserved-word set (case-insensitive)
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_SET
        .get_or_init(|| RESERVED_WORDS.iter().copied().collect())
        .contains(name.to_ascii_lowercase().as_str())
}

/// Check a name against pattern, length bound, and reserved-word set
pub fn is_valid_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LENGTH && name_pattern().is_match(name) && !is_reserved_word(name)
}

/// Logical role of a platform resource created during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRole {
    /// Tabular storage holding the static data files and tables
    Lakehouse,
    /// Time-series storage holding ingested telemetry tables
    Eventhouse,
    /// Ontology/graph resource holding entity and relationship definitions
    Ontology,
}

impl ResourceRole {
    /// Creation order: data-layer resources before the ontology that binds them
    pub const CREATION_ORDER: [ResourceRole; 3] =
        [Self::Lakehouse, Self::Eventhouse, Self::Ontology];

    /// Deletion order: reverse of creation, since ontology bindings reference
    /// the data-layer resources and the platform rejects deleting a
    /// referenced resource first
    pub const DELETION_ORDER: [ResourceRole; 3] =
        [Self::Ontology, Self::Eventhouse, Self::Lakehouse];

    /// Resource name derived from the package naming convention.
    ///
    /// Name-based discovery (cleanup fallback, recovery) matches this exactly
    /// and never fuzzily.
    pub fn conventional_name(&self, package_name: &str) -> String {
        match self {
            Self::Lakehouse => format!("{package_name}_Lakehouse"),
            Self::Eventhouse => format!("{package_name}_Eventhouse"),
            Self::Ontology => format!("{package_name}_Ontology"),
        }
    }
}

impl fmt::Display for ResourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lakehouse => write!(f, "lakehouse"),
            Self::Eventhouse => write!(f, "eventhouse"),
            Self::Ontology => write!(f, "ontology"),
        }
    }
}

impl std::str::FromStr for ResourceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lakehouse" => Ok(Self::Lakehouse),
            "eventhouse" => Ok(Self::Eventhouse),
            "ontology" => Ok(Self::Ontology),
            _ => Err(format!("Invalid resource role: {s}")),
        }
    }
}
