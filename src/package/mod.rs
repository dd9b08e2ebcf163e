//! # Demo Package Model
//!
//! Read-only representation of a demo package directory: manifest, ontology
//! descriptor, bindings, and data file inventory. Loaded once per run and
//! never mutated.
//!
//! Loading is lenient about content so the validator can report every
//! problem at once: a missing or unparsable ontology/bindings file becomes a
//! recorded load issue rather than an immediate error. Only the manifest is
//! mandatory at load time, since the package name keys all derived resource
//! names and the state file location.

pub mod bindings;
pub mod ontology;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    BINDINGS_FILE, DATA_DIR, MANIFEST_FILE, ONTOLOGY_FILE, TIMESERIES_DIR,
};
use crate::error::{SetupError, SetupResult};

pub use bindings::{
    Binding, BindingSet, PropertyMapping, RelationshipBinding, StaticBinding, TimeseriesBinding,
};
pub use ontology::{EntityDef, Ontology, PropertyDef, RelationshipDef};

/// Package manifest (`demo.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Package identity; keys resource names and the state file
    pub name: String,

    /// Optional human-facing title
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A validated-on-demand demo package directory tree
#[derive(Debug, Clone)]
pub struct DemoPackage {
    root: PathBuf,
    manifest: Manifest,
    ontology: Option<Ontology>,
    bindings: Option<BindingSet>,
    data_files: Vec<PathBuf>,
    timeseries_files: Vec<PathBuf>,
    load_issues: Vec<String>,
}

impl DemoPackage {
    /// Load a package from its root directory.
    ///
    /// Fails only when the directory or its manifest is missing or
    /// malformed; every other structural problem is recorded in
    /// [`load_issues`](Self::load_issues) for the validator to report.
    pub fn load(root: impl AsRef<Path>) -> SetupResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SetupError::package(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest_raw = std::fs::read_to_string(&manifest_path).map_err(|e| {
            SetupError::package(format!("cannot read {}: {e}", manifest_path.display()))
        })?;
        let manifest: Manifest = serde_yaml::from_str(&manifest_raw).map_err(|e| {
            SetupError::package(format!("invalid manifest {}: {e}", manifest_path.display()))
        })?;
        if manifest.name.is_empty() {
            return Err(SetupError::package("manifest name must not be empty"));
        }

        let mut load_issues = Vec::new();

        let ontology = match Self::read_yaml::<Ontology>(&root.join(ONTOLOGY_FILE)) {
            Ok(ontology) => Some(ontology),
            Err(issue) => {
                load_issues.push(issue);
                None
            }
        };

        let bindings = match Self::read_yaml::<BindingSet>(&root.join(BINDINGS_FILE)) {
            Ok(bindings) => Some(bindings),
            Err(issue) => {
                load_issues.push(issue);
                None
            }
        };

        let data_files = Self::list_csv_files(&root.join(DATA_DIR));
        let timeseries_files = Self::list_csv_files(&root.join(TIMESERIES_DIR));

        Ok(Self {
            root,
            manifest,
            ontology,
            bindings,
            data_files,
            timeseries_files,
            load_issues,
        })
    }

    fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        serde_yaml::from_str(&content).map_err(|e| format!("invalid {}: {e}", path.display()))
    }

    fn list_csv_files(dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        files.sort();
        files
    }

    /// Package root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Package identity from the manifest
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Parsed ontology descriptor, if it loaded cleanly
    pub fn ontology(&self) -> Option<&Ontology> {
        self.ontology.as_ref()
    }

    /// Parsed bindings, if they loaded cleanly
    pub fn bindings(&self) -> Option<&BindingSet> {
        self.bindings.as_ref()
    }

    /// Ontology, or a package error when it failed to load
    pub fn require_ontology(&self) -> SetupResult<&Ontology> {
        self.ontology
            .as_ref()
            .ok_or_else(|| SetupError::package("ontology definition failed to load"))
    }

    /// Bindings, or a package error when they failed to load
    pub fn require_bindings(&self) -> SetupResult<&BindingSet> {
        self.bindings
            .as_ref()
            .ok_or_else(|| SetupError::package("bindings descriptor failed to load"))
    }

    /// Tabular data files under `data/`, sorted by name
    pub fn data_files(&self) -> &[PathBuf] {
        &self.data_files
    }

    /// Time-series data files under `timeseries/`, sorted by name
    pub fn timeseries_files(&self) -> &[PathBuf] {
        &self.timeseries_files
    }

    /// Structural problems found while loading package content
    pub fn load_issues(&self) -> &[String] {
        &self.load_issues
    }

    /// State file location for this package
    pub fn state_path(&self) -> PathBuf {
        self.root
            .join(crate::constants::STATE_DIR)
            .join(crate::constants::STATE_FILE)
    }
}
