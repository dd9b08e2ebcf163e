#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Demoforge
//!
//! Resumable setup orchestration for demo data packages.
//!
//! ## Overview
//!
//! Demoforge takes a validated demo package (ontology definition, tabular
//! data, time-series data, and a bindings descriptor) and provisions it into
//! a cloud analytics platform: a lakehouse for tabular data, an eventhouse
//! for telemetry, and an ontology binding both together. The pipeline is a
//! fixed sequence of eleven named steps with per-step idempotency checks,
//! durable progress state, resume-from-failure semantics, and cleanup that
//! deletes only what it created.
//!
//! ## Module Organization
//!
//! - [`package`] - demo package model: manifest, ontology, bindings
//! - [`validation`] - full-report structural and content checks
//! - [`state`] - durable setup state and the atomic state store
//! - [`clients`] - platform service boundaries, retries, HTTP clients
//! - [`orchestration`] - step executors, coordinator, cleanup, recovery
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - structured error handling
//! - [`cli`] - command-line surface
//!
//! ## Guarantees
//!
//! - A step's mutating calls are never issued before the previous step is
//!   durably marked completed in the state store.
//! - Cleanup deletes exactly the recorded resource IDs, in reverse
//!   dependency order; name-based discovery is an explicit, exact-match
//!   fallback.
//! - Dry-run issues read-only calls only and persists nothing.

pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod package;
pub mod state;
pub mod validation;

pub use config::DemoforgeConfig;
pub use constants::ResourceRole;
pub use error::{SetupError, SetupResult};
pub use orchestration::{
    CleanupEngine, CleanupOptions, RunResult, SetupCoordinator, SetupOptions, SetupStep,
};
pub use package::DemoPackage;
pub use state::{OverallStatus, SetupState, StateStore, StepStatus};
pub use validation::{ValidationReport, Validator};
