//! # Step Execution
//!
//! One executor per pipeline step, all sharing the same shape: an existence
//! check first, then the mutating calls, then an outcome carrying created
//! resource IDs and a human-readable action log. In dry-run mode the
//! existence checks still run (read-only) but no mutating call is issued.
//!
//! Every step's mutating calls are either a single platform call or
//! independently idempotent sub-calls, so a step interrupted by a crash is
//! always safe to retry from scratch.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::clients::{BindingKind, PlatformClients, PlatformError, RemoteFile};
use crate::config::{DemoforgeConfig, OnExisting};
use crate::constants::ResourceRole;
use crate::error::{SetupError, SetupResult};
use crate::orchestration::payloads;
use crate::orchestration::steps::SetupStep;
use crate::package::DemoPackage;
use crate::state::SetupState;
use crate::validation::Validator;

/// Result of executing (or planning) one step
#[derive(Debug, Default)]
pub struct StepOutcome {
    /// Resources created or adopted by this step
    pub resources: Vec<(ResourceRole, String)>,
    /// What the step did, or would do under dry-run
    pub actions: Vec<String>,
}

impl StepOutcome {
    fn action(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(action = %message, "step action");
        self.actions.push(message);
    }
}

/// Execution options forwarded from the coordinator
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    pub allow_invalid: bool,
}

/// Executes individual pipeline steps against the platform clients
pub struct StepRunner<'a> {
    package: &'a DemoPackage,
    clients: &'a PlatformClients,
    config: &'a DemoforgeConfig,
    workspace_id: &'a str,
}

impl<'a> StepRunner<'a> {
    pub fn new(
        package: &'a DemoPackage,
        clients: &'a PlatformClients,
        config: &'a DemoforgeConfig,
        workspace_id: &'a str,
    ) -> Self {
        Self {
            package,
            clients,
            config,
            workspace_id,
        }
    }

    /// Execute one step. `state` provides resource IDs recorded by earlier
    /// steps; the caller merges the returned outcome back into state.
    pub async fn execute(
        &self,
        step: SetupStep,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        info!(step = %step, ordinal = step.ordinal(), dry_run = options.dry_run, "executing step");
        match step {
            SetupStep::Validate => self.validate(options).await,
            SetupStep::CreateLakehouse => {
                self.create_resource(ResourceRole::Lakehouse, state, options).await
            }
            SetupStep::UploadFiles => self.upload_files(state, options).await,
            SetupStep::LoadTables => self.load_tables(state, options).await,
            SetupStep::CreateEventhouse => {
                self.create_resource(ResourceRole::Eventhouse, state, options).await
            }
            SetupStep::IngestData => self.ingest_data(state, options).await,
            SetupStep::CreateOntology => {
                self.create_resource(ResourceRole::Ontology, state, options).await
            }
            SetupStep::BindStatic => self.bind_static(state, options).await,
            SetupStep::BindTimeseries => self.bind_timeseries(state, options).await,
            SetupStep::BindRelationships => self.bind_relationships(state, options).await,
            SetupStep::Verify => self.verify(state).await,
        }
    }

    async fn validate(&self, options: ExecuteOptions) -> SetupResult<StepOutcome> {
        let report = Validator::validate(self.package);
        let mut outcome = StepOutcome::default();
        if report.has_errors() {
            if options.allow_invalid {
                outcome.action(format!(
                    "validation reported {} error(s), continuing because --allow-invalid was given",
                    report.errors.len()
                ));
                return Ok(outcome);
            }
            return Err(SetupError::Validation { report });
        }
        outcome.action(format!(
            "validation passed with {} warning(s)",
            report.warnings.len()
        ));
        Ok(outcome)
    }

    /// Shared create-or-adopt logic for the three creation steps
    async fn create_resource(
        &self,
        role: ResourceRole,
        _state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let name = role.conventional_name(self.package.name());
        let mut outcome = StepOutcome::default();

        let existing = match role {
            ResourceRole::Lakehouse => {
                self.clients.lakehouse.find_by_name(self.workspace_id, &name).await?
            }
            ResourceRole::Eventhouse => {
                self.clients.eventhouse.find_by_name(self.workspace_id, &name).await?
            }
            ResourceRole::Ontology => {
                self.clients.ontology.find_by_name(self.workspace_id, &name).await?
            }
        };

        if let Some(resource) = existing {
            return match self.config.behavior.on_existing {
                OnExisting::Adopt => {
                    outcome.action(format!("adopted existing {role} '{name}' ({})", resource.id));
                    outcome.resources.push((role, resource.id));
                    Ok(outcome)
                }
                OnExisting::Fail => Err(SetupError::ResourceConflict { name }),
            };
        }

        if options.dry_run {
            outcome.action(format!("would create {role} '{name}'"));
            return Ok(outcome);
        }

        let created = match role {
            ResourceRole::Lakehouse => {
                self.clients.lakehouse.create(self.workspace_id, &name).await?
            }
            ResourceRole::Eventhouse => {
                self.clients.eventhouse.create(self.workspace_id, &name).await?
            }
            ResourceRole::Ontology => {
                let definition = payloads::ontology_definition(self.package.require_ontology()?);
                self.clients
                    .ontology
                    .create(self.workspace_id, &name, &definition)
                    .await?
            }
        };
        outcome.action(format!("created {role} '{name}' ({})", created.id));
        outcome.resources.push((role, created.id));
        Ok(outcome)
    }

    async fn upload_files(
        &self,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let Some(lakehouse_id) = state.resource(ResourceRole::Lakehouse) else {
            return self.plan_without_id(
                SetupStep::UploadFiles,
                options,
                format!("would upload {} data file(s)", self.package.data_files().len()),
            );
        };

        let remote_files = self.clients.lakehouse.list_files(lakehouse_id).await?;

        for path in self.package.data_files() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let content = std::fs::read(path)?;

            if self.config.behavior.skip_existing_uploads
                && Self::already_uploaded(&remote_files, &file_name, &content)
            {
                outcome.action(format!("skipping '{file_name}' (already present, unchanged)"));
                continue;
            }
            if options.dry_run {
                outcome.action(format!("would upload '{file_name}' ({} bytes)", content.len()));
                continue;
            }
            self.clients
                .lakehouse
                .upload_file(lakehouse_id, &file_name, &content)
                .await?;
            outcome.action(format!("uploaded '{file_name}' ({} bytes)", content.len()));
        }
        Ok(outcome)
    }

    /// Size must match, and when the platform reports a checksum it must
    /// match too.
    fn already_uploaded(remote_files: &[RemoteFile], name: &str, content: &[u8]) -> bool {
        remote_files.iter().any(|remote| {
            remote.name == name
                && remote.size_bytes == content.len() as u64
                && remote
                    .checksum
                    .as_ref()
                    .map(|checksum| checksum == &sha256_hex(content))
                    .unwrap_or(true)
        })
    }

    async fn load_tables(
        &self,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let bindings = self.package.require_bindings()?;
        let tables = bindings.static_tables();

        let Some(lakehouse_id) = state.resource(ResourceRole::Lakehouse) else {
            return self.plan_without_id(
                SetupStep::LoadTables,
                options,
                format!("would load {} table(s)", tables.len()),
            );
        };

        let existing = self.clients.lakehouse.list_tables(lakehouse_id).await?;
        for table in tables {
            if existing.iter().any(|t| t == table) {
                outcome.action(format!("table '{table}' already exists, skipping"));
                continue;
            }
            let source_file = format!("{table}.csv");
            if options.dry_run {
                outcome.action(format!("would load table '{table}' from '{source_file}'"));
                continue;
            }
            self.clients
                .lakehouse
                .load_table(lakehouse_id, table, &source_file)
                .await?;
            outcome.action(format!("loaded table '{table}' from '{source_file}'"));
        }
        Ok(outcome)
    }

    async fn ingest_data(
        &self,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let bindings = self.package.require_bindings()?;
        let tables = bindings.timeseries_tables();

        let Some(eventhouse_id) = state.resource(ResourceRole::Eventhouse) else {
            return self.plan_without_id(
                SetupStep::IngestData,
                options,
                format!("would ingest {} time-series table(s)", tables.len()),
            );
        };

        for table in tables {
            let row_count = self
                .clients
                .eventhouse
                .table_row_count(eventhouse_id, table)
                .await?;
            if row_count > 0 {
                outcome.action(format!(
                    "table '{table}' already holds {row_count} row(s), skipping"
                ));
                continue;
            }
            let file_name = format!("{table}.csv");
            let path = self
                .package
                .root()
                .join(crate::constants::TIMESERIES_DIR)
                .join(&file_name);
            if options.dry_run {
                outcome.action(format!("would ingest '{file_name}' into table '{table}'"));
                continue;
            }
            let content = std::fs::read(&path)?;
            self.clients
                .eventhouse
                .ingest(eventhouse_id, table, &file_name, &content)
                .await?;
            outcome.action(format!(
                "ingested '{file_name}' into table '{table}' ({} bytes)",
                content.len()
            ));
        }
        Ok(outcome)
    }

    async fn bind_static(
        &self,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let bindings = self.package.require_bindings()?;

        let Some(ontology_id) = state.resource(ResourceRole::Ontology) else {
            return self.plan_without_id(
                SetupStep::BindStatic,
                options,
                format!("would configure {} static binding(s)", bindings.statics().count()),
            );
        };

        let existing = self.clients.ontology.list_bindings(ontology_id).await?;
        for binding in bindings.statics() {
            if existing
                .iter()
                .any(|b| b.kind == BindingKind::Static && b.target == binding.entity)
            {
                outcome.action(format!(
                    "static binding for '{}' already configured, skipping",
                    binding.entity
                ));
                continue;
            }
            let spec = payloads::static_binding_spec(binding)?;
            if options.dry_run {
                outcome.action(format!("would bind '{}' to table '{}'", binding.entity, binding.table));
                continue;
            }
            self.clients.ontology.bind_static(ontology_id, &spec).await?;
            outcome.action(format!("bound '{}' to table '{}'", binding.entity, binding.table));
        }
        Ok(outcome)
    }

    async fn bind_timeseries(
        &self,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let bindings = self.package.require_bindings()?;

        let Some(ontology_id) = state.resource(ResourceRole::Ontology) else {
            return self.plan_without_id(
                SetupStep::BindTimeseries,
                options,
                format!(
                    "would configure {} time-series binding(s)",
                    bindings.timeseries().count()
                ),
            );
        };

        let existing = self.clients.ontology.list_bindings(ontology_id).await?;
        for binding in bindings.timeseries() {
            // the platform requires a static binding before a time-series
            // binding on the same entity
            if bindings.static_for_entity(&binding.entity).is_none() {
                return Err(SetupError::step_failed(
                    SetupStep::BindTimeseries,
                    format!(
                        "entity '{}' has a time-series binding but no static binding",
                        binding.entity
                    ),
                ));
            }
            if existing
                .iter()
                .any(|b| b.kind == BindingKind::Timeseries && b.target == binding.entity)
            {
                outcome.action(format!(
                    "time-series binding for '{}' already configured, skipping",
                    binding.entity
                ));
                continue;
            }
            let spec = payloads::timeseries_binding_spec(binding)?;
            if options.dry_run {
                outcome.action(format!(
                    "would bind time-series of '{}' to table '{}'",
                    binding.entity, binding.table
                ));
                continue;
            }
            self.clients.ontology.bind_timeseries(ontology_id, &spec).await?;
            outcome.action(format!(
                "bound time-series of '{}' to table '{}'",
                binding.entity, binding.table
            ));
        }
        Ok(outcome)
    }

    async fn bind_relationships(
        &self,
        state: &SetupState,
        options: ExecuteOptions,
    ) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let bindings = self.package.require_bindings()?;
        let ontology = self.package.require_ontology()?;

        let Some(ontology_id) = state.resource(ResourceRole::Ontology) else {
            return self.plan_without_id(
                SetupStep::BindRelationships,
                options,
                format!(
                    "would configure {} relationship binding(s)",
                    bindings.relationships().count()
                ),
            );
        };

        let existing = self.clients.ontology.list_bindings(ontology_id).await?;
        for binding in bindings.relationships() {
            if existing
                .iter()
                .any(|b| b.kind == BindingKind::Relationship && b.target == binding.relationship)
            {
                outcome.action(format!(
                    "relationship binding for '{}' already configured, skipping",
                    binding.relationship
                ));
                continue;
            }
            let spec = payloads::relationship_binding_spec(binding, ontology)?;
            if options.dry_run {
                outcome.action(format!(
                    "would contextualize relationship '{}' via table '{}'",
                    binding.relationship, binding.table
                ));
                continue;
            }
            self.clients.ontology.bind_relationship(ontology_id, &spec).await?;
            outcome.action(format!(
                "contextualized relationship '{}' via table '{}'",
                binding.relationship, binding.table
            ));
        }
        Ok(outcome)
    }

    /// Re-read every recorded resource and every binding from the platform
    /// and cross-check against the state store. Drift is a failure, never a
    /// silent pass.
    async fn verify(&self, state: &SetupState) -> SetupResult<StepOutcome> {
        let mut outcome = StepOutcome::default();
        let mut drift: Vec<String> = Vec::new();

        for (role, id) in &state.resources {
            let result = match role {
                ResourceRole::Lakehouse => self.clients.lakehouse.get(id).await,
                ResourceRole::Eventhouse => self.clients.eventhouse.get(id).await,
                ResourceRole::Ontology => self.clients.ontology.get(id).await,
            };
            match result {
                Ok(resource) => {
                    outcome.action(format!("{role} '{}' ({id}) present", resource.name));
                }
                Err(PlatformError::NotFound { .. }) => {
                    drift.push(format!("{role} '{id}' is recorded but missing on the platform"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(ontology_id) = state.resource(ResourceRole::Ontology) {
            let bindings = self.package.require_bindings()?;
            let remote = self.clients.ontology.list_bindings(ontology_id).await?;
            let present = |kind: BindingKind, target: &str| {
                remote.iter().any(|b| b.kind == kind && b.target == target)
            };
            for binding in bindings.statics() {
                if !present(BindingKind::Static, &binding.entity) {
                    drift.push(format!("static binding for '{}' is missing", binding.entity));
                }
            }
            for binding in bindings.timeseries() {
                if !present(BindingKind::Timeseries, &binding.entity) {
                    drift.push(format!(
                        "time-series binding for '{}' is missing",
                        binding.entity
                    ));
                }
            }
            for binding in bindings.relationships() {
                if !present(BindingKind::Relationship, &binding.relationship) {
                    drift.push(format!(
                        "relationship binding for '{}' is missing",
                        binding.relationship
                    ));
                }
            }
            outcome.action(format!("checked {} remote binding(s)", remote.len()));
        }

        if !drift.is_empty() {
            return Err(SetupError::step_failed(SetupStep::Verify, drift.join("; ")));
        }
        outcome.action("platform state matches recorded state".to_string());
        Ok(outcome)
    }

    /// Dry-run fallback when the resource ID a step needs has not been
    /// recorded yet (the creating step was itself only planned). Outside
    /// dry-run a missing ID means the dependency order was violated.
    fn plan_without_id(
        &self,
        step: SetupStep,
        options: ExecuteOptions,
        plan: String,
    ) -> SetupResult<StepOutcome> {
        if options.dry_run {
            let mut outcome = StepOutcome::default();
            outcome.action(plan);
            return Ok(outcome);
        }
        Err(SetupError::step_failed(
            step,
            "required resource ID is not recorded in state; run the earlier creation steps first",
        ))
    }
}

/// Hex-encoded SHA-256 digest of a byte buffer
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
