//! Binding descriptor model.
//!
//! Bindings are deserialized strictly into a tagged sum type so malformed
//! input fails at the parse boundary, not deep inside step execution. The
//! `kind` tag selects the variant; unknown fields are rejected.

use serde::{Deserialize, Serialize};

/// Parsed bindings descriptor (`bindings/bindings.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSet {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// One binding entry, discriminated by its `kind` tag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Binding {
    Static(StaticBinding),
    Timeseries(TimeseriesBinding),
    Relationship(RelationshipBinding),
}

/// Maps an entity's non-time-varying properties to columns of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticBinding {
    pub entity: String,
    pub table: String,
    pub key_column: String,
    pub properties: Vec<PropertyMapping>,
}

/// Maps an entity's time-varying properties to columns of a time-indexed table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeseriesBinding {
    pub entity: String,
    pub table: String,
    pub key_column: String,
    pub timestamp_column: String,
    pub properties: Vec<PropertyMapping>,
}

/// Configures the table and key columns realizing a relationship type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipBinding {
    pub relationship: String,
    pub source_entity: String,
    pub target_entity: String,
    pub table: String,
    pub source_key_column: String,
    pub target_key_column: String,
}

/// One property-to-column mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyMapping {
    pub property: String,
    pub column: String,
}

impl BindingSet {
    /// All static bindings in declaration order
    pub fn statics(&self) -> impl Iterator<Item = &StaticBinding> {
        self.bindings.iter().filter_map(|b| match b {
            Binding::Static(s) => Some(s),
            _ => None,
        })
    }

    /// All time-series bindings in declaration order
    pub fn timeseries(&self) -> impl Iterator<Item = &TimeseriesBinding> {
        self.bindings.iter().filter_map(|b| match b {
            Binding::Timeseries(t) => Some(t),
            _ => None,
        })
    }

    /// All relationship bindings in declaration order
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipBinding> {
        self.bindings.iter().filter_map(|b| match b {
            Binding::Relationship(r) => Some(r),
            _ => None,
        })
    }

    /// Static binding for a given entity, if declared
    pub fn static_for_entity(&self, entity: &str) -> Option<&StaticBinding> {
        self.statics().find(|s| s.entity == entity)
    }

    /// Tables referenced by static bindings, deduplicated, declaration order
    pub fn static_tables(&self) -> Vec<&str> {
        let mut tables = Vec::new();
        for binding in self.statics() {
            if !tables.contains(&binding.table.as_str()) {
                tables.push(binding.table.as_str());
            }
        }
        tables
    }

    /// Tables referenced by time-series bindings, deduplicated
    pub fn timeseries_tables(&self) -> Vec<&str> {
        let mut tables = Vec::new();
        for binding in self.timeseries() {
            if !tables.contains(&binding.table.as_str()) {
                tables.push(binding.table.as_str());
            }
        }
        tables
    }
}

impl StaticBinding {
    /// Whether the key column is mapped first, as the platform requires
    pub fn key_mapped_first(&self) -> bool {
        self.properties
            .first()
            .is_some_and(|m| m.column == self.key_column)
    }
}

impl TimeseriesBinding {
    /// Whether the key column is mapped first, as the platform requires
    pub fn key_mapped_first(&self) -> bool {
        self.properties
            .first()
            .is_some_and(|m| m.column == self.key_column)
    }
}
