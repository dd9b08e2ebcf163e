//! # Setup Coordinator
//!
//! Drives the step executors in pipeline order against the state store.
//! Progress is persisted synchronously at every transition: a step is
//! marked in-progress before its first mutating call and completed (with
//! its resource IDs) before the next step starts, so a crash at any point
//! leaves a state file `--resume` can continue from.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clients::PlatformClients;
use crate::config::DemoforgeConfig;
use crate::error::{SetupError, SetupResult};
use crate::orchestration::executor::{ExecuteOptions, StepRunner};
use crate::orchestration::steps::SetupStep;
use crate::package::DemoPackage;
use crate::state::{OverallStatus, SetupState, StateStore, StepStatus};

/// Options for a full setup run
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOptions {
    /// Plan every step without issuing mutating calls or writing state
    pub dry_run: bool,
    /// Skip steps already recorded as completed
    pub resume: bool,
    /// Discard existing state before running
    pub clear_state: bool,
    /// Run even when validation reports errors
    pub allow_invalid: bool,
}

/// How one step ended within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDisposition {
    /// Step executed its calls
    Executed,
    /// Step was skipped because state already records completion
    Skipped,
    /// Dry-run: actions were planned, nothing issued
    Planned,
}

/// Per-step entry in a run result
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: SetupStep,
    pub disposition: StepDisposition,
    pub actions: Vec<String>,
}

/// Outcome of a setup or single-step run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Correlates log lines from one invocation
    pub run_id: Uuid,
    pub package_name: String,
    pub overall_status: OverallStatus,
    pub dry_run: bool,
    pub steps: Vec<StepReport>,
}

/// Sequential, resumable setup orchestrator for one demo package
pub struct SetupCoordinator {
    package: DemoPackage,
    clients: PlatformClients,
    config: DemoforgeConfig,
    workspace_id: String,
    store: StateStore,
    cancel: Arc<AtomicBool>,
}

impl SetupCoordinator {
    pub fn new(
        package: DemoPackage,
        clients: PlatformClients,
        config: DemoforgeConfig,
        workspace_id: String,
    ) -> Self {
        let store = StateStore::new(package.state_path());
        Self {
            package,
            clients,
            config,
            workspace_id,
            store,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked at every step boundary; set it (e.g. from a SIGINT
    /// handler) to request a clean abort. A step in flight finishes first:
    /// partial step execution is disallowed by design.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// State store for this package
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run the full pipeline
    pub async fn run_setup(&self, options: SetupOptions) -> SetupResult<RunResult> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, package = self.package.name(), "starting setup run");

        if options.clear_state && !options.dry_run {
            self.store.clear()?;
            info!(package = self.package.name(), "existing state cleared");
        }

        let mut state = match self.store.try_load()? {
            Some(state) if state.overall_status.is_cleaned_up() => {
                // resources are gone; stale completion markers must not
                // short-circuit a fresh provisioning run
                info!(
                    package = self.package.name(),
                    "previous state was cleaned up, starting fresh"
                );
                SetupState::new(self.package.name(), &self.workspace_id)
            }
            Some(state) => state,
            None => SetupState::new(self.package.name(), &self.workspace_id),
        };

        if !options.dry_run {
            state.set_overall_status(OverallStatus::InProgress);
            self.store.save(&state)?;
        }

        let runner =
            StepRunner::new(&self.package, &self.clients, &self.config, &self.workspace_id);
        let execute_options = ExecuteOptions {
            dry_run: options.dry_run,
            allow_invalid: options.allow_invalid,
        };
        let mut reports = Vec::with_capacity(SetupStep::ALL.len());

        for step in SetupStep::ALL {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(step = %step, "cancellation requested, stopping before step");
                if !options.dry_run {
                    self.store.save(&state)?;
                }
                return Err(SetupError::Cancelled);
            }

            if options.resume && state.is_step_complete(step) {
                info!(step = %step, "already completed, skipping");
                reports.push(StepReport {
                    step,
                    disposition: StepDisposition::Skipped,
                    actions: vec!["already completed".to_string()],
                });
                continue;
            }

            if !options.dry_run {
                state.mark_step(step, StepStatus::InProgress);
                self.store.save(&state)?;
            }

            match runner.execute(step, &state, execute_options).await {
                Ok(outcome) => {
                    for (role, id) in outcome.resources {
                        state.record_resource(role, id);
                    }
                    if !options.dry_run {
                        state.mark_step(step, StepStatus::Completed);
                        self.store.save(&state)?;
                    }
                    reports.push(StepReport {
                        step,
                        disposition: if options.dry_run {
                            StepDisposition::Planned
                        } else {
                            StepDisposition::Executed
                        },
                        actions: outcome.actions,
                    });
                }
                Err(e) => {
                    error!(step = %step, error = %e, "step failed, stopping run");
                    if !options.dry_run {
                        state.mark_step_failed(step, e.to_string());
                        state.set_overall_status(OverallStatus::Failed);
                        self.store.save(&state)?;
                    }
                    return Err(e);
                }
            }
        }

        if !options.dry_run {
            state.set_overall_status(OverallStatus::Completed);
            self.store.save(&state)?;
        }
        info!(
            package = self.package.name(),
            dry_run = options.dry_run,
            "setup pipeline finished"
        );

        Ok(RunResult {
            run_id,
            package_name: self.package.name().to_string(),
            overall_status: if options.dry_run {
                OverallStatus::NotStarted
            } else {
                OverallStatus::Completed
            },
            dry_run: options.dry_run,
            steps: reports,
        })
    }

    /// Execute exactly one step.
    ///
    /// Without `force`, the step's declared dependency must be complete and
    /// an already-completed step is skipped. With `force`, the step re-runs
    /// regardless.
    pub async fn run_step(&self, step: SetupStep, force: bool) -> SetupResult<RunResult> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, step = %step, force, "starting single-step run");

        let mut state = match self.store.try_load()? {
            Some(state) => state,
            None => SetupState::new(self.package.name(), &self.workspace_id),
        };

        if !force {
            if state.is_step_complete(step) {
                info!(step = %step, "already completed; use --force to re-run");
                return Ok(RunResult {
                    run_id,
                    package_name: self.package.name().to_string(),
                    overall_status: state.overall_status,
                    dry_run: false,
                    steps: vec![StepReport {
                        step,
                        disposition: StepDisposition::Skipped,
                        actions: vec!["already completed; use --force to re-run".to_string()],
                    }],
                });
            }
            if let Some(dependency) = step.depends_on() {
                if !state.is_step_complete(dependency) {
                    return Err(SetupError::step_failed(
                        step,
                        format!(
                            "depends on step '{dependency}' which is not complete (use --force to override)"
                        ),
                    ));
                }
            }
        }

        let runner =
            StepRunner::new(&self.package, &self.clients, &self.config, &self.workspace_id);

        state.mark_step(step, StepStatus::InProgress);
        self.store.save(&state)?;

        match runner.execute(step, &state, ExecuteOptions::default()).await {
            Ok(outcome) => {
                for (role, id) in outcome.resources {
                    state.record_resource(role, id);
                }
                state.mark_step(step, StepStatus::Completed);
                if SetupStep::ALL.iter().all(|s| state.is_step_complete(*s)) {
                    state.set_overall_status(OverallStatus::Completed);
                }
                self.store.save(&state)?;
                Ok(RunResult {
                    run_id,
                    package_name: self.package.name().to_string(),
                    overall_status: state.overall_status,
                    dry_run: false,
                    steps: vec![StepReport {
                        step,
                        disposition: StepDisposition::Executed,
                        actions: outcome.actions,
                    }],
                })
            }
            Err(e) => {
                error!(step = %step, error = %e, "step failed");
                state.mark_step_failed(step, e.to_string());
                state.set_overall_status(OverallStatus::Failed);
                self.store.save(&state)?;
                Err(e)
            }
        }
    }
}
