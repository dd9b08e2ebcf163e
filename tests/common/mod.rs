//! Shared test helpers: an in-memory mock platform that records every
//! mutating call, plus demo package fixture builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use demoforge::clients::{
    BindingKind, CreatedResource, EventhouseService, LakehouseService, OntologyDefinition,
    OntologyService, PlatformClients, PlatformError, PlatformResult, RelationshipBindingSpec,
    RemoteBinding, RemoteFile, StaticBindingSpec, TimeseriesBindingSpec,
};
use demoforge::config::DemoforgeConfig;

/// Everything the mock platform knows, shared by the three service mocks
#[derive(Default)]
pub struct PlatformState {
    pub lakehouses: Vec<CreatedResource>,
    pub eventhouses: Vec<CreatedResource>,
    pub ontologies: Vec<CreatedResource>,
    /// lakehouse id → files
    pub files: HashMap<String, Vec<RemoteFile>>,
    /// lakehouse id → tables
    pub tables: HashMap<String, Vec<String>>,
    /// (eventhouse id, table) → row count
    pub rows: HashMap<(String, String), u64>,
    /// ontology id → bindings
    pub bindings: HashMap<String, Vec<RemoteBinding>>,
    /// every mutating call, in order
    pub mutating_calls: Vec<String>,
    /// call-name prefix → error message; matching calls fail permanently
    pub fail_on: HashMap<String, String>,
    next_id: u64,
}

impl PlatformState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn check_fail(&self, call: &str) -> PlatformResult<()> {
        for (prefix, message) in &self.fail_on {
            if call.starts_with(prefix.as_str()) {
                return Err(PlatformError::invalid_request(message.clone()));
            }
        }
        Ok(())
    }

    fn record(&mut self, call: String) -> PlatformResult<()> {
        self.check_fail(&call)?;
        self.mutating_calls.push(call);
        Ok(())
    }
}

/// Handle on the mock platform and its three service clients
#[derive(Clone)]
pub struct MockPlatform {
    pub state: Arc<Mutex<PlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState::default())),
        }
    }

    pub fn clients(&self) -> PlatformClients {
        PlatformClients::new(
            Arc::new(MockLakehouse(self.state.clone())),
            Arc::new(MockEventhouse(self.state.clone())),
            Arc::new(MockOntology(self.state.clone())),
        )
    }

    /// All mutating calls issued so far, in order
    pub fn mutating_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().mutating_calls.clone()
    }

    /// Make every call whose name starts with `prefix` fail permanently
    pub fn fail_calls(&self, prefix: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_on
            .insert(prefix.to_string(), message.to_string());
    }

    /// Stop failing calls with the given prefix
    pub fn clear_failure(&self, prefix: &str) {
        self.state.lock().unwrap().fail_on.remove(prefix);
    }

    /// Pre-create a resource, as if an earlier run or another tool made it
    pub fn seed_lakehouse(&self, name: &str, id: &str) {
        self.state.lock().unwrap().lakehouses.push(CreatedResource {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn seed_eventhouse(&self, name: &str, id: &str) {
        self.state.lock().unwrap().eventhouses.push(CreatedResource {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn seed_ontology(&self, name: &str, id: &str) {
        self.state.lock().unwrap().ontologies.push(CreatedResource {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Remove a binding behind the orchestrator's back (verify-drift tests)
    pub fn drop_binding(&self, ontology_id: &str, kind: BindingKind, target: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(bindings) = state.bindings.get_mut(ontology_id) {
            bindings.retain(|b| !(b.kind == kind && b.target == target));
        }
    }
}

pub struct MockLakehouse(Arc<Mutex<PlatformState>>);
pub struct MockEventhouse(Arc<Mutex<PlatformState>>);
pub struct MockOntology(Arc<Mutex<PlatformState>>);

#[async_trait::async_trait]
impl LakehouseService for MockLakehouse {
    async fn find_by_name(
        &self,
        _workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        let state = self.0.lock().unwrap();
        Ok(state.lakehouses.iter().find(|r| r.name == name).cloned())
    }

    async fn create(&self, _workspace_id: &str, name: &str) -> PlatformResult<CreatedResource> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("create_lakehouse:{name}"))?;
        let id = state.next_id("lh");
        let resource = CreatedResource {
            id,
            name: name.to_string(),
        };
        state.lakehouses.push(resource.clone());
        Ok(resource)
    }

    async fn get(&self, id: &str) -> PlatformResult<CreatedResource> {
        let state = self.0.lock().unwrap();
        state
            .lakehouses
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("lakehouse {id}")))
    }

    async fn list_files(&self, id: &str) -> PlatformResult<Vec<RemoteFile>> {
        let state = self.0.lock().unwrap();
        Ok(state.files.get(id).cloned().unwrap_or_default())
    }

    async fn upload_file(&self, id: &str, name: &str, content: &[u8]) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("upload_file:{name}"))?;
        let file = RemoteFile {
            name: name.to_string(),
            size_bytes: content.len() as u64,
            checksum: Some(demoforge::orchestration::executor::sha256_hex(content)),
        };
        let files = state.files.entry(id.to_string()).or_default();
        files.retain(|f| f.name != name);
        files.push(file);
        Ok(())
    }

    async fn list_tables(&self, id: &str) -> PlatformResult<Vec<String>> {
        let state = self.0.lock().unwrap();
        Ok(state.tables.get(id).cloned().unwrap_or_default())
    }

    async fn load_table(&self, id: &str, table: &str, _source_file: &str) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("load_table:{table}"))?;
        state
            .tables
            .entry(id.to_string())
            .or_default()
            .push(table.to_string());
        Ok(())
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("delete_lakehouse:{id}"))?;
        let before = state.lakehouses.len();
        state.lakehouses.retain(|r| r.id != id);
        if state.lakehouses.len() == before {
            return Err(PlatformError::not_found(format!("lakehouse {id}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventhouseService for MockEventhouse {
    async fn find_by_name(
        &self,
        _workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        let state = self.0.lock().unwrap();
        Ok(state.eventhouses.iter().find(|r| r.name == name).cloned())
    }

    async fn create(&self, _workspace_id: &str, name: &str) -> PlatformResult<CreatedResource> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("create_eventhouse:{name}"))?;
        let id = state.next_id("eh");
        let resource = CreatedResource {
            id,
            name: name.to_string(),
        };
        state.eventhouses.push(resource.clone());
        Ok(resource)
    }

    async fn get(&self, id: &str) -> PlatformResult<CreatedResource> {
        let state = self.0.lock().unwrap();
        state
            .eventhouses
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("eventhouse {id}")))
    }

    async fn table_row_count(&self, id: &str, table: &str) -> PlatformResult<u64> {
        let state = self.0.lock().unwrap();
        Ok(state
            .rows
            .get(&(id.to_string(), table.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn ingest(
        &self,
        id: &str,
        table: &str,
        _file_name: &str,
        content: &[u8],
    ) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("ingest:{table}"))?;
        let lines = content
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .count();
        // minus the header line
        let rows = (lines.saturating_sub(1) as u64).max(1);
        state.rows.insert((id.to_string(), table.to_string()), rows);
        Ok(())
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("delete_eventhouse:{id}"))?;
        let before = state.eventhouses.len();
        state.eventhouses.retain(|r| r.id != id);
        if state.eventhouses.len() == before {
            return Err(PlatformError::not_found(format!("eventhouse {id}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OntologyService for MockOntology {
    async fn find_by_name(
        &self,
        _workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        let state = self.0.lock().unwrap();
        Ok(state.ontologies.iter().find(|r| r.name == name).cloned())
    }

    async fn create(
        &self,
        _workspace_id: &str,
        name: &str,
        _definition: &OntologyDefinition,
    ) -> PlatformResult<CreatedResource> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("create_ontology:{name}"))?;
        let id = state.next_id("onto");
        let resource = CreatedResource {
            id,
            name: name.to_string(),
        };
        state.ontologies.push(resource.clone());
        Ok(resource)
    }

    async fn get(&self, id: &str) -> PlatformResult<CreatedResource> {
        let state = self.0.lock().unwrap();
        state
            .ontologies
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("ontology {id}")))
    }

    async fn list_bindings(&self, id: &str) -> PlatformResult<Vec<RemoteBinding>> {
        let state = self.0.lock().unwrap();
        Ok(state.bindings.get(id).cloned().unwrap_or_default())
    }

    async fn bind_static(&self, id: &str, spec: &StaticBindingSpec) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("bind_static:{}", spec.entity))?;
        state
            .bindings
            .entry(id.to_string())
            .or_default()
            .push(RemoteBinding {
                kind: BindingKind::Static,
                target: spec.entity.clone(),
            });
        Ok(())
    }

    async fn bind_timeseries(&self, id: &str, spec: &TimeseriesBindingSpec) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("bind_timeseries:{}", spec.entity))?;
        state
            .bindings
            .entry(id.to_string())
            .or_default()
            .push(RemoteBinding {
                kind: BindingKind::Timeseries,
                target: spec.entity.clone(),
            });
        Ok(())
    }

    async fn bind_relationship(
        &self,
        id: &str,
        spec: &RelationshipBindingSpec,
    ) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("bind_relationship:{}", spec.relationship))?;
        state
            .bindings
            .entry(id.to_string())
            .or_default()
            .push(RemoteBinding {
                kind: BindingKind::Relationship,
                target: spec.relationship.clone(),
            });
        Ok(())
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        let mut state = self.0.lock().unwrap();
        state.record(format!("delete_ontology:{id}"))?;
        let before = state.ontologies.len();
        state.ontologies.retain(|r| r.id != id);
        if state.ontologies.len() == before {
            return Err(PlatformError::not_found(format!("ontology {id}")));
        }
        Ok(())
    }
}

/// Write the standard two-entity fixture package into `root`
pub fn write_fixture_package(root: &Path, name: &str) {
    let write = |rel: &str, content: &str| {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    };

    write("demo.yaml", &format!("name: {name}\n"));
    write(
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
    write("data/pumps.csv", "pump_tag,capacity\nP1,100\nP2,200\n");
    write("data/tanks.csv", "tank_tag,volume\nT1,50\n");
    write(
        "timeseries/pump_telemetry.csv",
        "pump_tag,flow_rate,ts\nP1,1.5,2024-01-01T00:00:00Z\nP2,2.5,2024-01-01T00:00:00Z\n",
    );
}

/// Test configuration pointing at the mock platform
pub fn test_config() -> DemoforgeConfig {
    let mut config = DemoforgeConfig::default();
    config.platform.workspace_id = WORKSPACE.to_string();
    config
}

/// Workspace ID used across the suites
pub const WORKSPACE: &str = "ws-test";
