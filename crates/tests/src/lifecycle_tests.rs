//! Integration tests for the DAG lifecycle across epochs.
//!
//! These tests drive the manager the way a miner does: `ensure_ready` and `prepare_next`
//! on every block, and verify which datasets get built, loaded and kept resident.

use crate::mock_infrastructure::{
    default_test_settings, seed_for_height, BuilderStats, ManagerFixture, TestDatasetBuilder,
    EPOCH_LENGTH,
};
use dag_core::{
    config::DagSettings,
    dataset::{FixedDataDir, ProgressCallback},
    DagManager, ReadyOutcome,
};
use std::sync::Arc;

#[tokio::test]
async fn test_block_walk_pregenerates_every_epoch() {
    let fixture = ManagerFixture::default();
    let manager = &fixture.manager;
    let (mut generated, mut loaded, mut already_active) = (0, 0, 0);

    for height in (0..3 * EPOCH_LENGTH).step_by(10) {
        match manager.ensure_ready(height, ProgressCallback::noop()).await {
            ReadyOutcome::Generated { .. } => generated += 1,
            ReadyOutcome::Loaded { .. } => loaded += 1,
            ReadyOutcome::AlreadyActive { .. } => already_active += 1,
            other => panic!("unexpected outcome at height {height}: {other:?}"),
        }
        manager.prepare_next(height).await;
        manager.wait_for_background().await;
    }

    let stats = &fixture.builder.stats;
    assert_eq!(generated, 1);
    assert_eq!(loaded, 2);
    assert_eq!(already_active, 300 - 3);
    // Epoch 0 in the foreground, epochs 1 to 3 ahead of their boundary
    assert_eq!(BuilderStats::get(&stats.builds_finished), 4);
    assert_eq!(BuilderStats::get(&stats.loads), 2);
    assert_eq!(stats.resident_epochs(), vec![2]);
    // A look-ahead build coexists with the serving dataset, nothing more
    assert!(BuilderStats::get(&stats.peak_resident) <= 2);
    assert!(manager.path_for(3 * EPOCH_LENGTH).is_valid(&*fixture.builder));
}

#[tokio::test]
async fn test_file_name_follows_epoch_and_seed() {
    let fixture = ManagerFixture::default();

    fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    fixture.manager.ensure_ready(EPOCH_LENGTH + 10, ProgressCallback::noop()).await;
    fixture.manager.wait_for_background().await;

    let mut names: Vec<String> = std::fs::read_dir(fixture.data_dir.path().join("dag"))
        .expect("dag dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    assert_eq!(names, vec!["0000-010101010101.dag", "0001-020202020202.dag"]);
}

#[tokio::test]
async fn test_restart_loads_existing_file() {
    let fixture = ManagerFixture::default();
    fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    fixture.manager.shutdown().await;

    let builder = Arc::new(TestDatasetBuilder::new(EPOCH_LENGTH));
    let restarted = DagManager::builder()
        .with_settings(default_test_settings())
        .with_shared_dataset_builder(Arc::clone(&builder))
        .with_seed_provider(seed_for_height)
        .with_data_dir(FixedDataDir::new(fixture.data_dir.path()))
        .build()
        .expect("valid manager");

    let outcome = restarted.ensure_ready(500, ProgressCallback::noop()).await;

    assert!(matches!(outcome, ReadyOutcome::Loaded { epoch: 0 }));
    assert_eq!(BuilderStats::get(&builder.stats.builds_started), 0);
}

#[tokio::test]
async fn test_file_from_other_seed_is_not_used() {
    let fixture = ManagerFixture::default();
    fixture.manager.namer().ensure_dag_dir().expect("dag dir");
    // Same epoch, different seed prefix
    let stray = fixture.data_dir.path().join("dag").join("0000-ffffffffffff.dag");
    TestDatasetBuilder::write_file(0, &stray).expect("write");

    let outcome = fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;

    assert!(matches!(outcome, ReadyOutcome::Generated { epoch: 0, persisted: true }));
    assert_eq!(BuilderStats::get(&fixture.builder.stats.loads), 0);
}

#[tokio::test]
async fn test_jump_across_epochs_with_prepared_file() {
    let fixture = ManagerFixture::default();
    fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    fixture.write_dag_file(5 * EPOCH_LENGTH);

    let outcome = fixture.manager.ensure_ready(5 * EPOCH_LENGTH + 1, ProgressCallback::noop()).await;

    assert!(matches!(outcome, ReadyOutcome::Loaded { epoch: 5 }));
    assert_eq!(fixture.builder.stats.resident_epochs(), vec![5]);
}

#[tokio::test]
async fn test_installed_background_result_is_active() {
    let fixture = ManagerFixture::new(DagSettings {
        install_background_result: true,
        ..default_test_settings()
    });
    let manager = &fixture.manager;
    manager.ensure_ready(10, ProgressCallback::noop()).await;

    let outcome = manager.ensure_ready(EPOCH_LENGTH + 10, ProgressCallback::noop()).await;
    assert!(matches!(outcome, ReadyOutcome::BackgroundStarted { epoch: 1 }));
    manager.wait_for_background().await;

    assert_eq!(manager.active_epoch(), Some(1));
    let outcome = manager.ensure_ready(EPOCH_LENGTH + 20, ProgressCallback::noop()).await;
    assert!(matches!(outcome, ReadyOutcome::AlreadyActive { epoch: 1 }));
    assert_eq!(BuilderStats::get(&fixture.builder.stats.loads), 0);
    assert_eq!(fixture.builder.stats.resident_epochs(), vec![1]);
}

#[tokio::test]
async fn test_failed_save_leaves_no_file() {
    let fixture = ManagerFixture::default();
    fixture.builder.fail_saves.store(true, std::sync::atomic::Ordering::SeqCst);

    let outcome = fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    assert!(matches!(outcome, ReadyOutcome::Generated { epoch: 0, persisted: false }));

    fixture.builder.fail_saves.store(false, std::sync::atomic::Ordering::SeqCst);
    fixture.manager.shutdown().await;
    assert!(!fixture.manager.path_for(10).path().exists());
}
