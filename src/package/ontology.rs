//! Ontology descriptor model: entities with key properties, and the
//! relationship types connecting them.

use serde::{Deserialize, Serialize};

/// Parsed ontology definition (`ontology/ontology.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ontology {
    #[serde(default)]
    pub entities: Vec<EntityDef>,

    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
}

/// One entity type with its key property and property list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    pub name: String,

    /// Name of the property identifying instances of this entity
    pub key_property: String,

    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

/// A single scalar property on an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDef {
    pub name: String,
    pub data_type: String,
}

/// A relationship type between two entities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipDef {
    pub name: String,
    pub source: String,
    pub target: String,
}

impl Ontology {
    /// Look up an entity definition by name (case-sensitive)
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Look up a relationship definition by name (case-sensitive)
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

impl EntityDef {
    /// Whether the declared key property appears in the property list
    pub fn declares_key_property(&self) -> bool {
        self.properties.iter().any(|p| p.name == self.key_property)
    }
}
