//! Cleanup and recovery scenarios: ID-scoped deletion, deletion ordering,
//! idempotency, exact-name fallback, and state reconstruction.

mod common;

use common::{test_config, write_fixture_package, MockPlatform, WORKSPACE};
use demoforge::constants::ResourceRole;
use demoforge::error::SetupError;
use demoforge::orchestration::{
    CleanupEngine, CleanupOptions, SetupCoordinator, SetupOptions, SetupStep,
};
use demoforge::package::DemoPackage;
use demoforge::state::{OverallStatus, SetupState, StateStore, StepStatus};
use tempfile::TempDir;

fn engine(platform: &MockPlatform, dir: &TempDir) -> CleanupEngine {
    let package = DemoPackage::load(dir.path()).unwrap();
    CleanupEngine::new(
        package,
        platform.clients(),
        test_config(),
        WORKSPACE.to_string(),
    )
}

async fn provision(platform: &MockPlatform, dir: &TempDir) {
    let package = DemoPackage::load(dir.path()).unwrap();
    let coordinator = SetupCoordinator::new(
        package,
        platform.clients(),
        test_config(),
        WORKSPACE.to_string(),
    );
    coordinator.run_setup(SetupOptions::default()).await.unwrap();
}

#[tokio::test]
async fn cleanup_deletes_in_reverse_dependency_order() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    provision(&platform, &dir).await;

    let engine = engine(&platform, &dir);
    let result = engine.cleanup(CleanupOptions::default()).await.unwrap();
    assert_eq!(result.deleted.len(), 3);

    let deletes: Vec<String> = platform
        .mutating_calls()
        .into_iter()
        .filter(|c| c.starts_with("delete_"))
        .collect();
    assert!(deletes[0].starts_with("delete_ontology:"));
    assert!(deletes[1].starts_with("delete_eventhouse:"));
    assert!(deletes[2].starts_with("delete_lakehouse:"));
}

#[tokio::test]
async fn cleanup_scopes_to_recorded_ids_only() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();

    // resources recorded by a previous run
    platform.seed_lakehouse("Demo1_Lakehouse", "A");
    platform.seed_eventhouse("Demo1_Eventhouse", "B");
    // a same-named lakehouse that predates this run and must survive
    platform.seed_lakehouse("Demo1_Lakehouse", "older-twin");

    let package = DemoPackage::load(dir.path()).unwrap();
    let store = StateStore::new(package.state_path());
    let mut state = SetupState::new("Demo1", WORKSPACE);
    state.record_resource(ResourceRole::Lakehouse, "A");
    state.record_resource(ResourceRole::Eventhouse, "B");
    store.save(&state).unwrap();

    let engine = engine(&platform, &dir);
    let result = engine.cleanup(CleanupOptions::default()).await.unwrap();

    let deletes: Vec<String> = platform
        .mutating_calls()
        .into_iter()
        .filter(|c| c.starts_with("delete_"))
        .collect();
    // exactly two deletes: eventhouse first (no ontology recorded), then lakehouse
    assert_eq!(deletes, vec!["delete_eventhouse:B", "delete_lakehouse:A"]);
    assert_eq!(result.deleted.len(), 2);

    // the pre-existing same-named resource is untouched
    let survivors = platform.state.lock().unwrap().lakehouses.clone();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id, "older-twin");
}

#[tokio::test]
async fn cleanup_preserves_step_history_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    provision(&platform, &dir).await;

    let engine = engine(&platform, &dir);
    engine.cleanup(CleanupOptions::default()).await.unwrap();

    // state file retained with history, resources cleared
    let state = engine.store().load().unwrap();
    assert_eq!(state.overall_status, OverallStatus::CleanedUp);
    assert!(state.resources.is_empty());
    assert_eq!(state.step_status(SetupStep::BindStatic), StepStatus::Completed);

    // second cleanup has nothing to do and issues no deletes
    let deletes_before = platform
        .mutating_calls()
        .iter()
        .filter(|c| c.starts_with("delete_"))
        .count();
    let result = engine.cleanup(CleanupOptions::default()).await.unwrap();
    assert!(result.nothing_to_do);
    let deletes_after = platform
        .mutating_calls()
        .iter()
        .filter(|c| c.starts_with("delete_"))
        .count();
    assert_eq!(deletes_before, deletes_after);
}

#[tokio::test]
async fn cleanup_treats_missing_resource_as_already_gone() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    platform.seed_lakehouse("Demo1_Lakehouse", "A");

    let package = DemoPackage::load(dir.path()).unwrap();
    let store = StateStore::new(package.state_path());
    let mut state = SetupState::new("Demo1", WORKSPACE);
    state.record_resource(ResourceRole::Lakehouse, "A");
    state.record_resource(ResourceRole::Eventhouse, "vanished");
    store.save(&state).unwrap();

    let engine = engine(&platform, &dir);
    let result = engine.cleanup(CleanupOptions::default()).await.unwrap();
    assert_eq!(result.deleted, vec![(ResourceRole::Lakehouse, "A".to_string())]);
    assert_eq!(
        result.already_gone,
        vec![(ResourceRole::Eventhouse, "vanished".to_string())]
    );
    assert_eq!(engine.store().load().unwrap().overall_status, OverallStatus::CleanedUp);
}

#[tokio::test]
async fn cleanup_without_state_requires_explicit_fallback() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();

    let engine = engine(&platform, &dir);
    let err = engine.cleanup(CleanupOptions::default()).await.unwrap_err();
    assert!(matches!(err, SetupError::StateNotFound));
}

#[tokio::test]
async fn name_fallback_matches_exactly_never_by_prefix() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    platform.seed_lakehouse("Demo1_Lakehouse", "mine");
    platform.seed_lakehouse("Demo10_Lakehouse", "not-mine");

    let engine = engine(&platform, &dir);
    let result = engine
        .cleanup(CleanupOptions {
            force_by_name: true,
            dry_run: false,
        })
        .await
        .unwrap();

    assert_eq!(result.deleted, vec![(ResourceRole::Lakehouse, "mine".to_string())]);
    let survivors = platform.state.lock().unwrap().lakehouses.clone();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].name, "Demo10_Lakehouse");
}

#[tokio::test]
async fn cleanup_dry_run_only_plans() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    provision(&platform, &dir).await;

    let engine = engine(&platform, &dir);
    let result = engine
        .cleanup(CleanupOptions {
            force_by_name: false,
            dry_run: true,
        })
        .await
        .unwrap();

    assert_eq!(result.planned.len(), 3);
    assert!(result.deleted.is_empty());
    assert!(!platform
        .mutating_calls()
        .iter()
        .any(|c| c.starts_with("delete_")));
    // state untouched
    let state = engine.store().load().unwrap();
    assert_eq!(state.overall_status, OverallStatus::Completed);
    assert_eq!(state.resources.len(), 3);
}

#[tokio::test]
async fn recover_rebuilds_state_from_conventional_names() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    platform.seed_lakehouse("Demo1_Lakehouse", "lh-lost");
    platform.seed_ontology("Demo1_Ontology", "onto-lost");

    let engine = engine(&platform, &dir);
    let state = engine.recover(false).await.unwrap();

    assert_eq!(state.resource(ResourceRole::Lakehouse), Some("lh-lost"));
    assert_eq!(state.resource(ResourceRole::Ontology), Some("onto-lost"));
    assert!(state.resource(ResourceRole::Eventhouse).is_none());
    assert_eq!(
        state.step_status(SetupStep::CreateLakehouse),
        StepStatus::Completed
    );
    assert_eq!(
        state.step_status(SetupStep::CreateEventhouse),
        StepStatus::NotStarted
    );
    // best-effort reconstruction never claims completion
    assert_eq!(state.overall_status, OverallStatus::InProgress);
    assert!(engine.store().exists());
}

#[tokio::test]
async fn recover_refuses_to_overwrite_loadable_state_without_force() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    provision(&platform, &dir).await;

    let engine = engine(&platform, &dir);
    let err = engine.recover(false).await.unwrap_err();
    assert!(matches!(err, SetupError::StateExists));

    // forced recovery rebuilds from the platform
    let state = engine.recover(true).await.unwrap();
    assert_eq!(state.resources.len(), 3);
}

#[tokio::test]
async fn recover_rebuilds_over_corrupt_state_without_force() {
    let dir = TempDir::new().unwrap();
    write_fixture_package(dir.path(), "Demo1");
    let platform = MockPlatform::new();
    platform.seed_eventhouse("Demo1_Eventhouse", "eh-lost");

    let package = DemoPackage::load(dir.path()).unwrap();
    let store = StateStore::new(package.state_path());
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "{definitely not yaml: [").unwrap();

    let engine = engine(&platform, &dir);
    let state = engine.recover(false).await.unwrap();
    assert_eq!(state.resource(ResourceRole::Eventhouse), Some("eh-lost"));
    // the rebuilt file loads cleanly now
    assert!(store.load().is_ok());
}
