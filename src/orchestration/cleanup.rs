//! # Cleanup Engine and Recovery
//!
//! Deletes the platform resources a setup run created, scoped strictly to
//! the identifiers recorded in the state store and ordered by reverse
//! creation dependency. A name-based fallback exists for lost state, but it
//! is opt-in, logged as higher-risk, and matches the package naming
//! convention exactly, never fuzzily.
//!
//! Cleanup never touches the demo package's own files, and never deletes
//! the state file: the run's step history is retained for audit with the
//! resource map cleared.

use tracing::{info, warn};

use crate::clients::{PlatformClients, PlatformError};
use crate::config::DemoforgeConfig;
use crate::constants::ResourceRole;
use crate::error::{SetupError, SetupResult};
use crate::orchestration::steps::SetupStep;
use crate::package::DemoPackage;
use crate::state::{OverallStatus, SetupState, StateStore, StepStatus};

/// Options for a cleanup run
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOptions {
    /// Discover resources by conventional name instead of recorded IDs.
    /// Higher-risk: only for lost or untrustworthy state.
    pub force_by_name: bool,
    /// Report what would be deleted without issuing delete calls
    pub dry_run: bool,
}

/// Outcome of a cleanup run
#[derive(Debug, Clone, Default)]
pub struct CleanupResult {
    /// Resources deleted this run (role, id)
    pub deleted: Vec<(ResourceRole, String)>,
    /// Resources that were already gone on the platform
    pub already_gone: Vec<(ResourceRole, String)>,
    /// Dry-run: resources that would be deleted
    pub planned: Vec<(ResourceRole, String)>,
    /// True when the state was already cleaned up and no work remained
    pub nothing_to_do: bool,
}

/// Deletes created resources and reconstructs lost state
pub struct CleanupEngine {
    package: DemoPackage,
    clients: PlatformClients,
    workspace_id: String,
    store: StateStore,
}

impl CleanupEngine {
    pub fn new(
        package: DemoPackage,
        clients: PlatformClients,
        _config: DemoforgeConfig,
        workspace_id: String,
    ) -> Self {
        let store = StateStore::new(package.state_path());
        Self {
            package,
            clients,
            workspace_id,
            store,
        }
    }

    /// State store for this package
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Delete the resources this package's setup created.
    ///
    /// Default mode reads recorded IDs from the state store and deletes
    /// exactly those, in ontology → eventhouse → lakehouse order. Running
    /// against an already-cleaned-up state reports nothing to do.
    pub async fn cleanup(&self, options: CleanupOptions) -> SetupResult<CleanupResult> {
        if options.force_by_name {
            return self.cleanup_by_name(options).await;
        }

        let mut state = self.store.load()?;
        if state.overall_status.is_cleaned_up() || state.resources.is_empty() {
            info!(package = self.package.name(), "nothing to clean up");
            return Ok(CleanupResult {
                nothing_to_do: true,
                ..CleanupResult::default()
            });
        }

        let targets: Vec<(ResourceRole, String)> = ResourceRole::DELETION_ORDER
            .iter()
            .filter_map(|role| state.resource(*role).map(|id| (*role, id.to_string())))
            .collect();

        if options.dry_run {
            for (role, id) in &targets {
                info!(role = %role, id = %id, "would delete");
            }
            return Ok(CleanupResult {
                planned: targets,
                ..CleanupResult::default()
            });
        }

        let mut result = CleanupResult::default();
        for (role, id) in targets {
            match self.delete_resource(role, &id).await {
                Ok(()) => {
                    info!(role = %role, id = %id, "deleted");
                    result.deleted.push((role, id.clone()));
                }
                Err(PlatformError::NotFound { .. }) => {
                    info!(role = %role, id = %id, "already gone");
                    result.already_gone.push((role, id.clone()));
                }
                Err(e) => return Err(e.into()),
            }
            // persist after every deletion so an interrupted cleanup resumes
            // with only the remaining resources
            state.resources.remove(&role);
            self.store.save(&state)?;
        }

        state.mark_cleaned_up();
        self.store.save(&state)?;
        info!(package = self.package.name(), "cleanup complete, state retained for audit");
        Ok(result)
    }

    /// Name-convention fallback: deletes resources whose names exactly match
    /// `{package}_Lakehouse` / `{package}_Eventhouse` / `{package}_Ontology`.
    async fn cleanup_by_name(&self, options: CleanupOptions) -> SetupResult<CleanupResult> {
        warn!(
            package = self.package.name(),
            "name-based cleanup requested; deleting by naming convention instead of recorded IDs"
        );

        let mut targets = Vec::new();
        for role in ResourceRole::DELETION_ORDER {
            let name = role.conventional_name(self.package.name());
            let found = match role {
                ResourceRole::Lakehouse => {
                    self.clients.lakehouse.find_by_name(&self.workspace_id, &name).await?
                }
                ResourceRole::Eventhouse => {
                    self.clients.eventhouse.find_by_name(&self.workspace_id, &name).await?
                }
                ResourceRole::Ontology => {
                    self.clients.ontology.find_by_name(&self.workspace_id, &name).await?
                }
            };
            // exact name match only; find_by_name already filters exactly
            if let Some(resource) = found {
                targets.push((role, resource.id));
            }
        }

        if options.dry_run {
            return Ok(CleanupResult {
                planned: targets,
                ..CleanupResult::default()
            });
        }

        let mut result = CleanupResult::default();
        if targets.is_empty() {
            result.nothing_to_do = true;
            return Ok(result);
        }

        for (role, id) in targets {
            match self.delete_resource(role, &id).await {
                Ok(()) => {
                    info!(role = %role, id = %id, "deleted");
                    result.deleted.push((role, id));
                }
                Err(PlatformError::NotFound { .. }) => {
                    result.already_gone.push((role, id));
                }
                Err(e) => return Err(e.into()),
            }
        }

        // when a loadable state file survives, bring it in line with reality
        if let Ok(Some(mut state)) = self.store.try_load() {
            state.mark_cleaned_up();
            self.store.save(&state)?;
        }

        Ok(result)
    }

    async fn delete_resource(&self, role: ResourceRole, id: &str) -> Result<(), PlatformError> {
        match role {
            ResourceRole::Lakehouse => self.clients.lakehouse.delete(id).await,
            ResourceRole::Eventhouse => self.clients.eventhouse.delete(id).await,
            ResourceRole::Ontology => self.clients.ontology.delete(id).await,
        }
    }

    /// Best-effort state reconstruction: search the workspace for resources
    /// matching the naming convention and repopulate the resource map,
    /// marking the corresponding creation steps completed.
    ///
    /// Refuses to overwrite a loadable state file without `force`; a
    /// corrupt file is untrustworthy and may be rebuilt directly.
    pub async fn recover(&self, force: bool) -> SetupResult<SetupState> {
        match self.store.try_load() {
            Ok(Some(_)) if !force => return Err(SetupError::StateExists),
            Ok(_) => {}
            Err(SetupError::StateCorruption { path, .. }) => {
                warn!(path = %path.display(), "state file is corrupt, rebuilding");
            }
            Err(e) => return Err(e),
        }

        let mut state = SetupState::new(self.package.name(), &self.workspace_id);
        let mut found_any = false;

        for role in ResourceRole::CREATION_ORDER {
            let name = role.conventional_name(self.package.name());
            let found = match role {
                ResourceRole::Lakehouse => {
                    self.clients.lakehouse.find_by_name(&self.workspace_id, &name).await?
                }
                ResourceRole::Eventhouse => {
                    self.clients.eventhouse.find_by_name(&self.workspace_id, &name).await?
                }
                ResourceRole::Ontology => {
                    self.clients.ontology.find_by_name(&self.workspace_id, &name).await?
                }
            };
            if let Some(resource) = found {
                info!(role = %role, id = %resource.id, name = %name, "discovered resource");
                state.record_resource(role, resource.id);
                state.mark_step(Self::creation_step(role), StepStatus::Completed);
                found_any = true;
            }
        }

        if found_any {
            // reconstruction is best-effort; never claim full completion
            state.set_overall_status(OverallStatus::InProgress);
        }
        self.store.save(&state)?;
        info!(
            package = self.package.name(),
            resources = state.resources.len(),
            "state reconstructed"
        );
        Ok(state)
    }

    fn creation_step(role: ResourceRole) -> SetupStep {
        match role {
            ResourceRole::Lakehouse => SetupStep::CreateLakehouse,
            ResourceRole::Eventhouse => SetupStep::CreateEventhouse,
            ResourceRole::Ontology => SetupStep::CreateOntology,
        }
    }
}
