//! # Demo Package Validation
//!
//! Structural, naming, and content checks for demo packages. Every check
//! runs independently and the full error list is reported at once, so
//! authors fix a package in one pass instead of replaying failures.
//!
//! Validation is a pure read: no side effects, no platform calls.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    is_reserved_word, name_pattern, BINDINGS_FILE, DATA_DIR, MAX_NAME_LENGTH, ONTOLOGY_FILE,
    SUPPORTED_DATA_TYPES, TIMESERIES_DIR,
};
use crate::package::{DemoPackage, PropertyMapping};

/// Outcome of validating a demo package.
///
/// Errors block `setup` (unless explicitly overridden); warnings never do.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Package validator. Stateless; rule data lives in [`crate::constants`].
pub struct Validator;

impl Validator {
    /// Run every check against the package and return the full report.
    pub fn validate(package: &DemoPackage) -> ValidationReport {
        let mut report = ValidationReport::default();

        Self::check_layout(package, &mut report);

        for issue in package.load_issues() {
            report.error(issue.clone());
        }

        if let Some(ontology) = package.ontology() {
            Self::check_ontology_names(ontology, &mut report);
            Self::check_property_uniqueness(ontology, &mut report);
            Self::check_data_types(ontology, &mut report);

            if let Some(bindings) = package.bindings() {
                Self::check_static_bindings(ontology, bindings, &mut report);
                Self::check_timeseries_bindings(ontology, bindings, &mut report);
                Self::check_relationship_bindings(ontology, bindings, &mut report);
                Self::check_data_files(package.root(), bindings, &mut report);
                Self::check_unreferenced(package, ontology, bindings, &mut report);
            }
        }

        report
    }

    fn check_layout(package: &DemoPackage, report: &mut ValidationReport) {
        let root = package.root();
        for required in [
            Path::new(ONTOLOGY_FILE).parent().unwrap_or(Path::new("")),
            Path::new(DATA_DIR),
            Path::new(BINDINGS_FILE).parent().unwrap_or(Path::new("")),
        ] {
            if !root.join(required).is_dir() {
                report.error(format!("required directory '{}' is missing", required.display()));
            }
        }
        // timeseries/ is only required when time-series bindings exist
        let has_ts_bindings = package
            .bindings()
            .map(|b| b.timeseries().count() > 0)
            .unwrap_or(false);
        if has_ts_bindings && !root.join(TIMESERIES_DIR).is_dir() {
            report.error(format!(
                "time-series bindings are declared but directory '{TIMESERIES_DIR}' is missing"
            ));
        }
    }

    fn check_name(kind: &str, name: &str, report: &mut ValidationReport) {
        if name.len() > MAX_NAME_LENGTH {
            report.error(format!(
                "{kind} name '{name}' exceeds the {MAX_NAME_LENGTH}-character limit"
            ));
        } else if !name_pattern().is_match(name) {
            report.error(format!(
                "{kind} name '{name}' does not match the required pattern [A-Za-z][A-Za-z0-9_]*"
            ));
        }
        if is_reserved_word(name) {
            report.error(format!("{kind} name '{name}' is a reserved word"));
        }
    }

    fn check_ontology_names(
        ontology: &crate::package::Ontology,
        report: &mut ValidationReport,
    ) {
        for entity in &ontology.entities {
            Self::check_name("entity", &entity.name, report);
            for property in &entity.properties {
                Self::check_name("property", &property.name, report);
            }
            if !entity.declares_key_property() {
                report.error(format!(
                    "entity '{}' declares key property '{}' which is not in its property list",
                    entity.name, entity.key_property
                ));
            }
        }
        for relationship in &ontology.relationships {
            Self::check_name("relationship", &relationship.name, report);
            if ontology.entity(&relationship.source).is_none() {
                report.error(format!(
                    "relationship '{}' references unknown source entity '{}'",
                    relationship.name, relationship.source
                ));
            }
            if ontology.entity(&relationship.target).is_none() {
                report.error(format!(
                    "relationship '{}' references unknown target entity '{}'",
                    relationship.name, relationship.target
                ));
            }
        }
    }

    /// Property names must be unique across the entire ontology, not just
    /// within one entity: the platform flattens them into one namespace.
    fn check_property_uniqueness(
        ontology: &crate::package::Ontology,
        report: &mut ValidationReport,
    ) {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for entity in &ontology.entities {
            for property in &entity.properties {
                match owners.get(property.name.as_str()) {
                    Some(first) if *first != entity.name => {
                        report.error(format!(
                            "property name '{}' is declared by both '{}' and '{}' but must be unique across the ontology",
                            property.name, first, entity.name
                        ));
                    }
                    Some(_) => {
                        report.error(format!(
                            "property name '{}' is declared twice on entity '{}'",
                            property.name, entity.name
                        ));
                    }
                    None => {
                        owners.insert(&property.name, &entity.name);
                    }
                }
            }
        }
    }

    fn check_data_types(ontology: &crate::package::Ontology, report: &mut ValidationReport) {
        for entity in &ontology.entities {
            for property in &entity.properties {
                if !SUPPORTED_DATA_TYPES.contains(&property.data_type.as_str()) {
                    report.error(format!(
                        "property '{}.{}' uses unsupported data type '{}' (supported: {})",
                        entity.name,
                        property.name,
                        property.data_type,
                        SUPPORTED_DATA_TYPES.join(", ")
                    ));
                }
            }
        }
    }

    fn check_mapping_targets(
        entity: &crate::package::EntityDef,
        mappings: &[PropertyMapping],
        context: &str,
        report: &mut ValidationReport,
    ) {
        for mapping in mappings {
            if !entity.properties.iter().any(|p| p.name == mapping.property) {
                report.error(format!(
                    "{context} maps unknown property '{}' of entity '{}'",
                    mapping.property, entity.name
                ));
            }
        }
    }

    fn check_static_bindings(
        ontology: &crate::package::Ontology,
        bindings: &crate::package::BindingSet,
        report: &mut ValidationReport,
    ) {
        for binding in bindings.statics() {
            let context = format!("static binding for '{}'", binding.entity);
            let Some(entity) = ontology.entity(&binding.entity) else {
                report.error(format!("{context} references an unknown entity"));
                continue;
            };
            if !binding.key_mapped_first() {
                report.error(format!(
                    "{context}: key column '{}' must be the first entry of its property mapping list",
                    binding.key_column
                ));
            }
            Self::check_mapping_targets(entity, &binding.properties, &context, report);
        }
    }

    fn check_timeseries_bindings(
        ontology: &crate::package::Ontology,
        bindings: &crate::package::BindingSet,
        report: &mut ValidationReport,
    ) {
        for binding in bindings.timeseries() {
            let context = format!("time-series binding for '{}'", binding.entity);
            let Some(entity) = ontology.entity(&binding.entity) else {
                report.error(format!("{context} references an unknown entity"));
                continue;
            };
            if !binding.key_mapped_first() {
                report.error(format!(
                    "{context}: key column '{}' must be the first entry of its property mapping list",
                    binding.key_column
                ));
            }
            // The platform requires a static binding before a time-series
            // binding on the same entity.
            if bindings.static_for_entity(&binding.entity).is_none() {
                report.error(format!(
                    "entity '{}' has a time-series binding but no static binding",
                    binding.entity
                ));
            }
            Self::check_mapping_targets(entity, &binding.properties, &context, report);
        }
    }

    fn check_relationship_bindings(
        ontology: &crate::package::Ontology,
        bindings: &crate::package::BindingSet,
        report: &mut ValidationReport,
    ) {
        for binding in bindings.relationships() {
            let context = format!("relationship binding for '{}'", binding.relationship);
            if ontology.relationship(&binding.relationship).is_none() {
                report.error(format!("{context} references an unknown relationship"));
            }
            match ontology.entity(&binding.source_entity) {
                None => report.error(format!(
                    "{context} references unknown source entity '{}'",
                    binding.source_entity
                )),
                Some(entity) if binding.source_key_column != entity.key_property => {
                    report.error(format!(
                        "{context}: source key column '{}' must equal key property '{}' of entity '{}'",
                        binding.source_key_column, entity.key_property, entity.name
                    ));
                }
                Some(_) => {}
            }
            match ontology.entity(&binding.target_entity) {
                None => report.error(format!(
                    "{context} references unknown target entity '{}'",
                    binding.target_entity
                )),
                Some(entity) if binding.target_key_column != entity.key_property => {
                    report.error(format!(
                        "{context}: target key column '{}' must equal key property '{}' of entity '{}'",
                        binding.target_key_column, entity.key_property, entity.name
                    ));
                }
                Some(_) => {}
            }
        }
    }

    fn check_data_files(
        root: &Path,
        bindings: &crate::package::BindingSet,
        report: &mut ValidationReport,
    ) {
        for binding in bindings.statics() {
            let path = root.join(DATA_DIR).join(format!("{}.csv", binding.table));
            let context = format!("data file for table '{}'", binding.table);
            let columns: Vec<&str> =
                binding.properties.iter().map(|m| m.column.as_str()).collect();
            Self::check_csv(&path, &context, &columns, Some(&binding.key_column), report);
        }

        for binding in bindings.timeseries() {
            let path = root.join(TIMESERIES_DIR).join(format!("{}.csv", binding.table));
            let context = format!("time-series file for table '{}'", binding.table);
            let mut columns: Vec<&str> =
                binding.properties.iter().map(|m| m.column.as_str()).collect();
            columns.push(binding.timestamp_column.as_str());
            // key uniqueness does not apply to time-series rows
            Self::check_csv(&path, &context, &columns, None, report);
        }
    }

    /// Header/uniqueness checks for the simple comma-separated files the
    /// demo generators emit (no quoting dialect).
    fn check_csv(
        path: &Path,
        context: &str,
        required_columns: &[&str],
        unique_key_column: Option<&str>,
        report: &mut ValidationReport,
    ) {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                report.error(format!("{context} is missing: {}", path.display()));
                return;
            }
        };
        let mut lines = content.lines();
        let Some(header_line) = lines.next() else {
            report.error(format!("{context} is empty"));
            return;
        };
        let header: Vec<&str> = header_line.split(',').map(str::trim).collect();

        for column in required_columns {
            if !header.contains(column) {
                report.error(format!("{context} is missing declared column '{column}'"));
            }
        }

        if let Some(key_column) = unique_key_column {
            let Some(key_index) = header.iter().position(|h| h == &key_column) else {
                // missing-column error already reported above
                return;
            };
            let mut seen = HashSet::new();
            for (row_number, line) in lines.enumerate() {
                let value = line.split(',').nth(key_index).map(str::trim).unwrap_or("");
                if value.is_empty() {
                    report.error(format!(
                        "{context}: key column '{key_column}' is empty at data row {}",
                        row_number + 1
                    ));
                } else if !seen.insert(value.to_string()) {
                    report.error(format!(
                        "{context}: key column '{key_column}' value '{value}' is duplicated at data row {}",
                        row_number + 1
                    ));
                }
            }
        }
    }

    fn check_unreferenced(
        package: &DemoPackage,
        ontology: &crate::package::Ontology,
        bindings: &crate::package::BindingSet,
        report: &mut ValidationReport,
    ) {
        let referenced: HashSet<String> = bindings
            .static_tables()
            .into_iter()
            .map(|t| format!("{t}.csv"))
            .collect();
        for file in package.data_files() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !referenced.contains(&name) {
                report.warning(format!("data file '{name}' is not referenced by any binding"));
            }
        }

        for entity in &ontology.entities {
            let bound = bindings.static_for_entity(&entity.name).is_some()
                || bindings.timeseries().any(|t| t.entity == entity.name);
            if !bound {
                report.warning(format!("entity '{}' has no bindings", entity.name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn valid_package(dir: &TempDir) -> DemoPackage {
        let root = dir.path();
        write(root, "demo.yaml", "name: Demo1\n");
        write(
            root,
            "ontology/ontology.yaml",
            r#"
entities:
  - name: Pump
    key_property: pump_tag
    properties:
      - name: pump_tag
        data_type: string
      - name: capacity
        data_type: double
      - name: flow_rate
        data_type: double
  - name: Tank
    key_property: tank_tag
    properties:
      - name: tank_tag
        data_type: string
      - name: volume
        data_type: double
relationships:
  - name: feeds
    source: Pump
    target: Tank
"#,
        );
        write(
            root,
            "bindings/bindings.yaml",
            r#"
bindings:
  - kind: static
    entity: Pump
    table: pumps
    key_column: pump_tag
    properties:
      - property: pump_tag
        column: pump_tag
      - property: capacity
        column: capacity
  - kind: static
    entity: Tank
    table: tanks
    key_column: tank_tag
    properties:
      - property: tank_tag
        column: tank_tag
      - property: volume
        column: volume
  - kind: timeseries
    entity: Pump
    table: pump_telemetry
    key_column: pump_tag
    timestamp_column: ts
    properties:
      - property: pump_tag
        column: pump_tag
      - property: flow_rate
        column: flow_rate
  - kind: relationship
    relationship: feeds
    source_entity: Pump
    target_entity: Tank
    table: pump_tank
    source_key_column: pump_tag
    target_key_column: tank_tag
"#,
        );
        write(root, "data/pumps.csv", "pump_tag,capacity\nP1,100\nP2,200\n");
        write(root, "data/tanks.csv", "tank_tag,volume\nT1,50\n");
        write(
            root,
            "timeseries/pump_telemetry.csv",
            "pump_tag,flow_rate,ts\nP1,1.5,2024-01-01T00:00:00Z\n",
        );
        DemoPackage::load(root).unwrap()
    }

    #[test]
    fn test_valid_package_has_no_errors() {
        let dir = TempDir::new().unwrap();
        let package = valid_package(&dir);
        let report = Validator::validate(&package);
        assert!(!report.has_errors(), "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
    }

    #[test]
    fn test_key_not_first_is_reported() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(
            dir.path(),
            "bindings/bindings.yaml",
            r#"
bindings:
  - kind: static
    entity: Pump
    table: pumps
    key_column: pump_tag
    properties:
      - property: capacity
        column: capacity
      - property: pump_tag
        column: pump_tag
"#,
        );
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("Pump") && e.contains("first entry")));
    }

    #[test]
    fn test_relationship_key_mismatch_names_both_values() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(
            dir.path(),
            "bindings/bindings.yaml",
            r#"
bindings:
  - kind: static
    entity: Pump
    table: pumps
    key_column: pump_tag
    properties:
      - property: pump_tag
        column: pump_tag
  - kind: static
    entity: Tank
    table: tanks
    key_column: tank_tag
    properties:
      - property: tank_tag
        column: tank_tag
  - kind: relationship
    relationship: feeds
    source_entity: Pump
    target_entity: Tank
    table: pump_tank
    source_key_column: pump_id
    target_key_column: tank_tag
"#,
        );
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        let message = report
            .errors
            .iter()
            .find(|e| e.contains("source key column"))
            .expect("mismatch reported");
        assert!(message.contains("pump_id"));
        assert!(message.contains("pump_tag"));
    }

    #[test]
    fn test_timeseries_without_static_is_error() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(
            dir.path(),
            "bindings/bindings.yaml",
            r#"
bindings:
  - kind: timeseries
    entity: Pump
    table: pump_telemetry
    key_column: pump_tag
    timestamp_column: ts
    properties:
      - property: pump_tag
        column: pump_tag
"#,
        );
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("time-series binding but no static binding")));
    }

    #[test]
    fn test_global_property_uniqueness() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(
            dir.path(),
            "ontology/ontology.yaml",
            r#"
entities:
  - name: Pump
    key_property: pump_tag
    properties:
      - name: pump_tag
        data_type: string
      - name: capacity
        data_type: double
  - name: Tank
    key_property: tank_tag
    properties:
      - name: tank_tag
        data_type: string
      - name: capacity
        data_type: double
"#,
        );
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("capacity") && e.contains("unique across the ontology")));
    }

    #[test]
    fn test_disallowed_data_type() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(
            dir.path(),
            "ontology/ontology.yaml",
            r#"
entities:
  - name: Pump
    key_property: pump_tag
    properties:
      - name: pump_tag
        data_type: string
      - name: unit_price
        data_type: decimal
"#,
        );
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("decimal") && e.contains("unsupported")));
    }

    #[test]
    fn test_duplicate_key_values_reported() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(dir.path(), "data/pumps.csv", "pump_tag,capacity\nP1,100\nP1,200\n");
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("P1") && e.contains("duplicated")));
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        // two independent problems: bad data type and a missing data file
        write(
            dir.path(),
            "ontology/ontology.yaml",
            r#"
entities:
  - name: Pump
    key_property: pump_tag
    properties:
      - name: pump_tag
        data_type: string
      - name: unit_price
        data_type: decimal
"#,
        );
        fs::remove_file(dir.path().join("data/tanks.csv")).unwrap();
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(report.errors.len() >= 2);
    }

    #[test]
    fn test_unreferenced_file_is_warning_only() {
        let dir = TempDir::new().unwrap();
        valid_package(&dir);
        write(dir.path(), "data/orphan.csv", "a,b\n1,2\n");
        let package = DemoPackage::load(dir.path()).unwrap();
        let report = Validator::validate(&package);
        assert!(!report.has_errors());
        assert!(report.warnings.iter().any(|w| w.contains("orphan.csv")));
    }
}
