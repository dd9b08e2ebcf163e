//! # Resource Service Clients
//!
//! Boundary contracts for the three external services setup provisions
//! against: tabular storage (lakehouse), time-series storage (eventhouse),
//! and the ontology/graph service. The orchestrator only ever talks to these
//! traits; the HTTP implementations live in [`http`] and tests substitute
//! in-memory mocks.
//!
//! Creation calls are long-running on the platform side: implementations
//! poll the operation to a terminal state and return the final resource, so
//! a returned ID is always valid. Transient failures are retried inside the
//! implementations via [`RetryPolicy`], transparent to callers.

pub mod error;
pub mod http;
pub mod retry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::{PlatformError, PlatformResult};
pub use http::{HttpClientConfig, HttpEventhouseService, HttpLakehouseService, HttpOntologyService};
pub use retry::RetryPolicy;

/// A resource that exists on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResource {
    /// Platform-assigned identifier
    pub id: String,
    /// Display name the resource was created with
    pub name: String,
}

/// A file present in a lakehouse's file area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the content, when the platform reports one
    pub checksum: Option<String>,
}

/// Kind discriminator for bindings reported by the ontology service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Static,
    Timeseries,
    Relationship,
}

/// A binding as reported back by the ontology service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBinding {
    pub kind: BindingKind,
    /// Entity name for static/time-series bindings, relationship name
    /// for relationship bindings
    pub target: String,
}

/// One property-to-column mapping in a binding request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub property: String,
    pub column: String,
}

/// Ontology creation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OntologyDefinition {
    pub entities: Vec<EntitySpec>,
    pub relationships: Vec<RelationshipSpec>,
}

/// Entity definition in an ontology creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    pub key_property: String,
    pub properties: Vec<PropertySpec>,
}

/// Property definition in an ontology creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub data_type: String,
}

/// Relationship definition in an ontology creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSpec {
    pub name: String,
    pub source: String,
    pub target: String,
}

/// Static binding request payload.
///
/// `columns[0]` is always the key property mapping; builders enforce this
/// before the request is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticBindingSpec {
    pub entity: String,
    pub table: String,
    pub key_column: String,
    pub columns: Vec<ColumnMapping>,
}

/// Time-series binding request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeseriesBindingSpec {
    pub entity: String,
    pub table: String,
    pub key_column: String,
    pub timestamp_column: String,
    pub columns: Vec<ColumnMapping>,
}

/// Relationship contextualization request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipBindingSpec {
    pub relationship: String,
    pub source_entity: String,
    pub target_entity: String,
    pub table: String,
    pub source_key_column: String,
    pub target_key_column: String,
}

/// Tabular storage service
#[async_trait::async_trait]
pub trait LakehouseService: Send + Sync {
    /// Find a lakehouse by exact display name
    async fn find_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>>;

    /// Create a lakehouse and wait for the operation to finish
    async fn create(&self, workspace_id: &str, name: &str) -> PlatformResult<CreatedResource>;

    /// Fetch a lakehouse by ID
    async fn get(&self, id: &str) -> PlatformResult<CreatedResource>;

    /// Files currently present in the lakehouse file area
    async fn list_files(&self, id: &str) -> PlatformResult<Vec<RemoteFile>>;

    /// Upload one file into the lakehouse file area
    async fn upload_file(&self, id: &str, name: &str, content: &[u8]) -> PlatformResult<()>;

    /// Tables currently queryable in the lakehouse
    async fn list_tables(&self, id: &str) -> PlatformResult<Vec<String>>;

    /// Convert an uploaded file into a queryable table
    async fn load_table(&self, id: &str, table: &str, source_file: &str) -> PlatformResult<()>;

    /// Delete the lakehouse
    async fn delete(&self, id: &str) -> PlatformResult<()>;
}

/// Time-series storage service
#[async_trait::async_trait]
pub trait EventhouseService: Send + Sync {
    /// Find an eventhouse by exact display name
    async fn find_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>>;

    /// Create an eventhouse and wait for the operation to finish
    async fn create(&self, workspace_id: &str, name: &str) -> PlatformResult<CreatedResource>;

    /// Fetch an eventhouse by ID
    async fn get(&self, id: &str) -> PlatformResult<CreatedResource>;

    /// Rows currently in a table (0 when the table does not exist)
    async fn table_row_count(&self, id: &str, table: &str) -> PlatformResult<u64>;

    /// Upload and ingest one time-series file into a table
    async fn ingest(
        &self,
        id: &str,
        table: &str,
        file_name: &str,
        content: &[u8],
    ) -> PlatformResult<()>;

    /// Delete the eventhouse
    async fn delete(&self, id: &str) -> PlatformResult<()>;
}

/// Ontology/graph service
#[async_trait::async_trait]
pub trait OntologyService: Send + Sync {
    /// Find an ontology by exact display name
    async fn find_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>>;

    /// Create an ontology resource from a definition and wait for completion
    async fn create(
        &self,
        workspace_id: &str,
        name: &str,
        definition: &OntologyDefinition,
    ) -> PlatformResult<CreatedResource>;

    /// Fetch an ontology by ID
    async fn get(&self, id: &str) -> PlatformResult<CreatedResource>;

    /// Bindings currently configured on the ontology
    async fn list_bindings(&self, id: &str) -> PlatformResult<Vec<RemoteBinding>>;

    /// Configure a static binding
    async fn bind_static(&self, id: &str, spec: &StaticBindingSpec) -> PlatformResult<()>;

    /// Configure a time-series binding
    async fn bind_timeseries(&self, id: &str, spec: &TimeseriesBindingSpec) -> PlatformResult<()>;

    /// Configure a relationship contextualization
    async fn bind_relationship(
        &self,
        id: &str,
        spec: &RelationshipBindingSpec,
    ) -> PlatformResult<()>;

    /// Delete the ontology
    async fn delete(&self, id: &str) -> PlatformResult<()>;
}

/// Bundle of the three service clients handed to the orchestrator
#[derive(Clone)]
pub struct PlatformClients {
    pub lakehouse: Arc<dyn LakehouseService>,
    pub eventhouse: Arc<dyn EventhouseService>,
    pub ontology: Arc<dyn OntologyService>,
}

impl PlatformClients {
    pub fn new(
        lakehouse: Arc<dyn LakehouseService>,
        eventhouse: Arc<dyn EventhouseService>,
        ontology: Arc<dyn OntologyService>,
    ) -> Self {
        Self {
            lakehouse,
            eventhouse,
            ontology,
        }
    }
}
