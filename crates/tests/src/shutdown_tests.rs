//! Shutdown and cancellation tests.
//!
//! Tests use `tokio::time::timeout` so a build that ignores cancellation fails the test
//! instead of hanging it.

use crate::mock_infrastructure::{
    default_test_settings, wait_for_count, BuilderStats, ManagerFixture, EPOCH_LENGTH,
};
use dag_core::{config::DagSettings, dataset::ProgressCallback, DagError, ReadyOutcome};
use std::sync::{atomic::Ordering, Arc};
use tokio::time::{timeout, Duration};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_cancels_background_generation() {
    let fixture = ManagerFixture::default();
    fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    fixture.builder.hold();

    let outcome = fixture.manager.ensure_ready(EPOCH_LENGTH + 10, ProgressCallback::noop()).await;
    assert!(matches!(outcome, ReadyOutcome::BackgroundStarted { epoch: 1 }));
    wait_for_count(&fixture.builder.stats.builds_started, 2).await;

    timeout(Duration::from_secs(2), fixture.manager.shutdown())
        .await
        .expect("shutdown should not wait for a held build");

    let stats = &fixture.builder.stats;
    assert_eq!(BuilderStats::get(&stats.builds_cancelled), 1);
    assert!(!fixture.manager.path_for(EPOCH_LENGTH + 10).path().exists());
    assert!(fixture.manager.active().is_none());
    assert!(stats.resident_epochs().is_empty());
    assert!(!fixture.manager.is_generating());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_cancels_foreground_generation() {
    let fixture = ManagerFixture::default();
    fixture.builder.hold();

    let manager = Arc::clone(&fixture.manager);
    let request =
        tokio::spawn(async move { manager.ensure_ready(10, ProgressCallback::noop()).await });
    wait_for_count(&fixture.builder.stats.builds_started, 1).await;

    fixture.manager.shutdown().await;
    let outcome = timeout(Duration::from_secs(2), request)
        .await
        .expect("foreground build should observe cancellation")
        .expect("request task");

    assert!(outcome.error().is_some_and(DagError::is_cancelled), "got {outcome:?}");
    assert!(fixture.manager.active().is_none());
    assert!(fixture.builder.stats.resident_epochs().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dropping_manager_cancels_background_generation() {
    let ManagerFixture { manager, builder, data_dir: _data_dir } = ManagerFixture::default();
    manager.ensure_ready(10, ProgressCallback::noop()).await;
    builder.hold();

    manager.ensure_ready(EPOCH_LENGTH + 10, ProgressCallback::noop()).await;
    wait_for_count(&builder.stats.builds_started, 2).await;
    drop(manager);

    wait_for_count(&builder.stats.builds_cancelled, 1).await;
    // The slot released epoch 0 on drop; the cancelled build never became resident
    assert!(builder.stats.resident_epochs().is_empty());
}

#[tokio::test]
async fn test_shutdown_twice_is_harmless() {
    let fixture = ManagerFixture::default();
    fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;

    fixture.manager.shutdown().await;
    fixture.manager.shutdown().await;

    assert_eq!(BuilderStats::get(&fixture.builder.stats.unloads), 1);
    let outcome = fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    assert!(matches!(outcome, ReadyOutcome::Failed(DagError::ShuttingDown)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_build_finishing_after_shutdown_is_not_installed() {
    let fixture = ManagerFixture::default();
    fixture.builder.stall_after_build_ms.store(300, Ordering::SeqCst);

    let manager = Arc::clone(&fixture.manager);
    let request =
        tokio::spawn(async move { manager.ensure_ready(10, ProgressCallback::noop()).await });
    wait_for_count(&fixture.builder.stats.builds_stalled, 1).await;

    fixture.manager.shutdown().await;
    let outcome = timeout(Duration::from_secs(2), request)
        .await
        .expect("request should finish once the build returns")
        .expect("request task");

    assert!(matches!(outcome, ReadyOutcome::Failed(DagError::ShuttingDown)), "got {outcome:?}");
    assert!(fixture.manager.active().is_none());
    assert!(fixture.builder.stats.resident_epochs().is_empty());
    // The file was written before the install was refused
    assert!(fixture.manager.path_for(10).is_valid(&*fixture.builder));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_background_install_racing_shutdown_is_released() {
    let fixture = ManagerFixture::new(DagSettings {
        install_background_result: true,
        ..default_test_settings()
    });
    fixture.manager.ensure_ready(10, ProgressCallback::noop()).await;
    fixture.builder.stall_after_build_ms.store(200, Ordering::SeqCst);

    let outcome = fixture.manager.ensure_ready(EPOCH_LENGTH + 10, ProgressCallback::noop()).await;
    assert!(matches!(outcome, ReadyOutcome::BackgroundStarted { epoch: 1 }));
    wait_for_count(&fixture.builder.stats.builds_stalled, 1).await;

    timeout(Duration::from_secs(2), fixture.manager.shutdown()).await.expect("shutdown");

    assert!(fixture.manager.active().is_none());
    assert!(fixture.builder.stats.resident_epochs().is_empty());
    let late = fixture.manager.prepare_next(2 * EPOCH_LENGTH - 1).await;
    assert!(matches!(late, ReadyOutcome::Failed(DagError::ShuttingDown)));
    assert!(!fixture.manager.is_generating());
}
