//! # Command-Line Interface
//!
//! Thin presentation layer over the validator, coordinator, and cleanup
//! engine: argument parsing, confirmation prompts, result rendering, and
//! exit-code mapping.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::clients::{
    HttpClientConfig, HttpEventhouseService, HttpLakehouseService, HttpOntologyService,
    PlatformClients,
};
use crate::config::DemoforgeConfig;
use crate::error::{SetupError, SetupResult};
use crate::orchestration::{
    CleanupEngine, CleanupOptions, RunResult, SetupCoordinator, SetupOptions, SetupStep,
    StepDisposition,
};
use crate::package::DemoPackage;
use crate::state::StateStore;
use crate::validation::Validator;

#[derive(Parser, Debug)]
#[command(name = "demoforge")]
#[command(about = "Provision demo data packages into lakehouse, eventhouse, and ontology resources")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file path (default: ./demoforge.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a demo package without touching the platform
    Validate {
        /// Package directory
        path: PathBuf,
    },

    /// Run the full setup pipeline
    Setup {
        /// Package directory
        path: PathBuf,
        /// Target workspace (overrides the configured workspace)
        #[arg(long)]
        workspace_id: Option<String>,
        /// Plan all steps without mutating anything or writing state
        #[arg(long)]
        dry_run: bool,
        /// Skip steps already recorded as completed
        #[arg(long)]
        resume: bool,
        /// Discard existing state before running
        #[arg(long)]
        clear_state: bool,
        /// Continue even when validation reports errors
        #[arg(long)]
        allow_invalid: bool,
    },

    /// Show recorded setup progress for a package
    Status {
        /// Package directory
        path: PathBuf,
    },

    /// Execute a single step by name or number
    RunStep {
        /// Package directory
        path: PathBuf,
        /// Step name (e.g. bind_static) or 1-based number
        #[arg(long)]
        step: SetupStep,
        /// Re-run even if already completed; skip the dependency check
        #[arg(long)]
        force: bool,
        /// Target workspace (overrides the configured workspace)
        #[arg(long)]
        workspace_id: Option<String>,
    },

    /// Delete the platform resources recorded for a package
    Cleanup {
        /// Package directory
        path: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "confirm")]
        confirm: bool,
        /// Discover resources by naming convention instead of recorded IDs
        #[arg(long)]
        force_by_name: bool,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
        /// Target workspace (overrides the configured workspace)
        #[arg(long)]
        workspace_id: Option<String>,
    },

    /// Rebuild a lost state file by searching the platform
    Recover {
        /// Package directory
        path: PathBuf,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
        /// Target workspace (overrides the configured workspace)
        #[arg(long)]
        workspace_id: Option<String>,
    },
}

/// Parse arguments, dispatch, and return the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let config = match DemoforgeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return e.exit_code();
        }
    };
    crate::logging::init_logging(cli.verbose, config.behavior.log_dir.as_deref());

    match dispatch(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(suggestion) = e.suggested_action() {
                eprintln!("hint: {suggestion}");
            }
            e.exit_code()
        }
    }
}

async fn dispatch(command: Commands, config: DemoforgeConfig) -> SetupResult<i32> {
    match command {
        Commands::Validate { path } => {
            let package = DemoPackage::load(&path)?;
            let report = Validator::validate(&package);
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            for error in &report.errors {
                println!("error: {error}");
            }
            if report.has_errors() {
                println!(
                    "package '{}' is invalid: {} error(s), {} warning(s)",
                    package.name(),
                    report.errors.len(),
                    report.warnings.len()
                );
                return Err(SetupError::Validation { report });
            }
            println!(
                "package '{}' is valid ({} warning(s))",
                package.name(),
                report.warnings.len()
            );
            Ok(0)
        }

        Commands::Setup {
            path,
            workspace_id,
            dry_run,
            resume,
            clear_state,
            allow_invalid,
        } => {
            let package = DemoPackage::load(&path)?;
            let workspace_id = resolve_workspace(&config, workspace_id)?;
            let clients = build_clients(&config)?;
            let coordinator = SetupCoordinator::new(package, clients, config, workspace_id);

            install_cancellation_handler(coordinator.cancellation_flag());

            match coordinator
                .run_setup(SetupOptions {
                    dry_run,
                    resume,
                    clear_state,
                    allow_invalid,
                })
                .await
            {
                Ok(result) => {
                    render_run(&result);
                    Ok(0)
                }
                Err(e) => {
                    report_failed_step(coordinator.store());
                    Err(e)
                }
            }
        }

        Commands::Status { path } => {
            let package = DemoPackage::load(&path)?;
            let store = StateStore::new(package.state_path());
            match store.try_load()? {
                None => {
                    println!("package '{}': no setup state recorded", package.name());
                }
                Some(state) => {
                    println!(
                        "package '{}' (workspace '{}'): {}",
                        state.package_name, state.workspace_id, state.overall_status
                    );
                    for step in SetupStep::ALL {
                        let status = state.step_status(step);
                        let detail = state
                            .step_record(step)
                            .and_then(|record| record.error.clone())
                            .map(|error| format!(" ({error})"))
                            .unwrap_or_default();
                        println!(
                            "  {:>2}. {:<20} {}{}",
                            step.ordinal(),
                            step.name(),
                            status,
                            detail
                        );
                    }
                    if !state.resources.is_empty() {
                        println!("resources:");
                        for (role, id) in &state.resources {
                            println!("  {role}: {id}");
                        }
                    }
                }
            }
            Ok(0)
        }

        Commands::RunStep {
            path,
            step,
            force,
            workspace_id,
        } => {
            let package = DemoPackage::load(&path)?;
            let workspace_id = resolve_workspace(&config, workspace_id)?;
            let clients = build_clients(&config)?;
            let coordinator = SetupCoordinator::new(package, clients, config, workspace_id);
            match coordinator.run_step(step, force).await {
                Ok(result) => {
                    render_run(&result);
                    Ok(0)
                }
                Err(e) => {
                    report_failed_step(coordinator.store());
                    Err(e)
                }
            }
        }

        Commands::Cleanup {
            path,
            confirm,
            force_by_name,
            dry_run,
            workspace_id,
        } => {
            let package = DemoPackage::load(&path)?;
            let workspace_id = resolve_workspace(&config, workspace_id)?;
            let clients = build_clients(&config)?;

            if !confirm && !dry_run && !prompt_confirmation(package.name())? {
                return Err(SetupError::Cancelled);
            }

            let engine = CleanupEngine::new(package, clients, config, workspace_id);
            let result = engine
                .cleanup(CleanupOptions {
                    force_by_name,
                    dry_run,
                })
                .await?;

            if result.nothing_to_do {
                println!("nothing to do: no resources recorded for this package");
            }
            for (role, id) in &result.planned {
                println!("would delete {role}: {id}");
            }
            for (role, id) in &result.deleted {
                println!("deleted {role}: {id}");
            }
            for (role, id) in &result.already_gone {
                println!("already gone {role}: {id}");
            }
            Ok(0)
        }

        Commands::Recover {
            path,
            force,
            workspace_id,
        } => {
            let package = DemoPackage::load(&path)?;
            let workspace_id = resolve_workspace(&config, workspace_id)?;
            let clients = build_clients(&config)?;
            let engine = CleanupEngine::new(package, clients, config, workspace_id);
            let state = engine.recover(force).await?;
            if state.resources.is_empty() {
                println!("no matching resources found; wrote an empty state file");
            } else {
                println!("recovered {} resource(s):", state.resources.len());
                for (role, id) in &state.resources {
                    println!("  {role}: {id}");
                }
            }
            Ok(0)
        }
    }
}

fn resolve_workspace(
    config: &DemoforgeConfig,
    override_id: Option<String>,
) -> SetupResult<String> {
    let workspace_id = override_id.unwrap_or_else(|| config.platform.workspace_id.clone());
    if workspace_id.is_empty() {
        return Err(SetupError::configuration(
            "no workspace configured; pass --workspace-id or set platform.workspace_id",
        ));
    }
    Ok(workspace_id)
}

fn build_clients(config: &DemoforgeConfig) -> SetupResult<PlatformClients> {
    let token = config.auth_token()?;
    let http_config = HttpClientConfig::from_config(config, token);
    Ok(PlatformClients::new(
        Arc::new(HttpLakehouseService::new(http_config.clone())?),
        Arc::new(HttpEventhouseService::new(http_config.clone())?),
        Arc::new(HttpOntologyService::new(http_config)?),
    ))
}

fn install_cancellation_handler(flag: Arc<std::sync::atomic::AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancellation requested, finishing the current step...");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

/// Print which step failed, from the persisted state, so the user knows
/// where `--resume` will pick up.
fn report_failed_step(store: &StateStore) {
    if let Ok(state) = store.load() {
        if let Some((step, record)) = state.failed_step() {
            eprintln!(
                "step {} ({}) failed{}",
                step.ordinal(),
                step.name(),
                record
                    .error
                    .as_deref()
                    .map(|e| format!(": {e}"))
                    .unwrap_or_default()
            );
        }
    }
}

fn prompt_confirmation(package_name: &str) -> SetupResult<bool> {
    print!("Delete the platform resources recorded for package '{package_name}'? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn render_run(result: &RunResult) {
    debug!(run_id = %result.run_id, "rendering run result");
    if result.dry_run {
        println!("dry run for package '{}':", result.package_name);
    } else {
        println!(
            "package '{}': {}",
            result.package_name, result.overall_status
        );
    }
    for report in &result.steps {
        let marker = match report.disposition {
            StepDisposition::Executed => "done",
            StepDisposition::Skipped => "skip",
            StepDisposition::Planned => "plan",
        };
        println!("  [{marker}] {}", report.step);
        for action in &report.actions {
            println!("         - {action}");
        }
    }
}
