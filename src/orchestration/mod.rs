//! # Setup Orchestration
//!
//! The resumable provisioning pipeline: eleven named steps executed in a
//! fixed dependency order, with progress persisted to the state store at
//! every transition and cleanup driven strictly by recorded resource IDs.
//!
//! ## Core Components
//!
//! - [`steps::SetupStep`]: static step metadata, ordinal 1–11
//! - [`executor::StepRunner`]: per-step existence checks and platform calls
//! - [`coordinator::SetupCoordinator`]: sequencing, resume, dry-run,
//!   single-step mode, cancellation at step boundaries
//! - [`cleanup::CleanupEngine`]: ID-scoped deletion in reverse dependency
//!   order, name-convention fallback, and best-effort state recovery
//! - [`payloads`]: pure builders from parsed descriptors to request payloads

pub mod cleanup;
pub mod coordinator;
pub mod executor;
pub mod payloads;
pub mod steps;

pub use cleanup::{CleanupEngine, CleanupOptions, CleanupResult};
pub use coordinator::{RunResult, SetupCoordinator, SetupOptions, StepDisposition, StepReport};
pub use executor::{ExecuteOptions, StepOutcome, StepRunner};
pub use steps::{SetupStep, StepDescriptor};
