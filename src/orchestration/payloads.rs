//! # Request Payload Builders
//!
//! Pure transformations from parsed package descriptors to the request
//! payloads the service clients send. Builders defensively re-validate the
//! binding invariants even though the validator has already checked them:
//! a payload that violates a platform rule must never leave this module.

use crate::clients::{
    ColumnMapping, EntitySpec, OntologyDefinition, PropertySpec, RelationshipBindingSpec,
    RelationshipSpec, StaticBindingSpec, TimeseriesBindingSpec,
};
use crate::error::{SetupError, SetupResult};
use crate::package::{Ontology, RelationshipBinding, StaticBinding, TimeseriesBinding};

/// Ontology creation payload from the parsed definition
pub fn ontology_definition(ontology: &Ontology) -> OntologyDefinition {
    OntologyDefinition {
        entities: ontology
            .entities
            .iter()
            .map(|entity| EntitySpec {
                name: entity.name.clone(),
                key_property: entity.key_property.clone(),
                properties: entity
                    .properties
                    .iter()
                    .map(|property| PropertySpec {
                        name: property.name.clone(),
                        data_type: property.data_type.clone(),
                    })
                    .collect(),
            })
            .collect(),
        relationships: ontology
            .relationships
            .iter()
            .map(|relationship| RelationshipSpec {
                name: relationship.name.clone(),
                source: relationship.source.clone(),
                target: relationship.target.clone(),
            })
            .collect(),
    }
}

/// Static binding payload; rejects bindings whose key column is not mapped
/// first.
pub fn static_binding_spec(binding: &StaticBinding) -> SetupResult<StaticBindingSpec> {
    if !binding.key_mapped_first() {
        return Err(SetupError::package(format!(
            "static binding for '{}' does not map key column '{}' first",
            binding.entity, binding.key_column
        )));
    }
    Ok(StaticBindingSpec {
        entity: binding.entity.clone(),
        table: binding.table.clone(),
        key_column: binding.key_column.clone(),
        columns: column_mappings(&binding.properties),
    })
}

/// Time-series binding payload; rejects bindings whose key column is not
/// mapped first.
pub fn timeseries_binding_spec(binding: &TimeseriesBinding) -> SetupResult<TimeseriesBindingSpec> {
    if !binding.key_mapped_first() {
        return Err(SetupError::package(format!(
            "time-series binding for '{}' does not map key column '{}' first",
            binding.entity, binding.key_column
        )));
    }
    Ok(TimeseriesBindingSpec {
        entity: binding.entity.clone(),
        table: binding.table.clone(),
        key_column: binding.key_column.clone(),
        timestamp_column: binding.timestamp_column.clone(),
        columns: column_mappings(&binding.properties),
    })
}

/// Relationship contextualization payload; rejects key-column names that do
/// not equal the corresponding entity's key property exactly.
pub fn relationship_binding_spec(
    binding: &RelationshipBinding,
    ontology: &Ontology,
) -> SetupResult<RelationshipBindingSpec> {
    let source = ontology.entity(&binding.source_entity).ok_or_else(|| {
        SetupError::package(format!(
            "relationship binding '{}' references unknown source entity '{}'",
            binding.relationship, binding.source_entity
        ))
    })?;
    let target = ontology.entity(&binding.target_entity).ok_or_else(|| {
        SetupError::package(format!(
            "relationship binding '{}' references unknown target entity '{}'",
            binding.relationship, binding.target_entity
        ))
    })?;
    if binding.source_key_column != source.key_property {
        return Err(SetupError::package(format!(
            "relationship binding '{}': source key column '{}' must equal '{}'",
            binding.relationship, binding.source_key_column, source.key_property
        )));
    }
    if binding.target_key_column != target.key_property {
        return Err(SetupError::package(format!(
            "relationship binding '{}': target key column '{}' must equal '{}'",
            binding.relationship, binding.target_key_column, target.key_property
        )));
    }
    Ok(RelationshipBindingSpec {
        relationship: binding.relationship.clone(),
        source_entity: binding.source_entity.clone(),
        target_entity: binding.target_entity.clone(),
        table: binding.table.clone(),
        source_key_column: binding.source_key_column.clone(),
        target_key_column: binding.target_key_column.clone(),
    })
}

fn column_mappings(mappings: &[crate::package::PropertyMapping]) -> Vec<ColumnMapping> {
    mappings
        .iter()
        .map(|m| ColumnMapping {
            property: m.property.clone(),
            column: m.column.clone(),
        })
        .collect()
}
