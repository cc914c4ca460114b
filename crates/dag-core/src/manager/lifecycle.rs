//! The lifecycle orchestrator.

use super::{
    builder::DagManagerBuilder,
    errors::DagError,
    generation::{generate_and_save, run_background_generation},
    outcome::ReadyOutcome,
};
use crate::{
    config::DagSettings,
    dataset::{Dataset, DatasetBuilder, ProgressCallback},
    guard::GenerationGuard,
    naming::{DagFile, DagFileNamer},
    slot::ActiveSlot,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Keeps the DAG for the current epoch loaded.
///
/// One manager owns one [`ActiveSlot`] and one [`GenerationGuard`]. Share it behind an
/// `Arc`; every method takes `&self`.
///
/// # Decision Flow
///
/// ```text
/// ensure_ready(height)
///       │
///       ▼
/// ┌──────────────────┐
/// │ epoch active?    │ ─── yes ──► AlreadyActive
/// └────────┬─────────┘
///          │ no
///          ▼
/// ┌──────────────────┐
/// │ file valid?      │ ─── yes ──► reset slot, load, install ──► Loaded
/// └────────┬─────────┘                     │
///          │ no                       load failed
///          ▼                               │
/// ┌──────────────────┐ ◄───────────────────┘
/// │ file valid now?  │ ─── yes ──► FilePresent
/// └────────┬─────────┘
///          │ no
///          ▼
/// ┌──────────────────┐
/// │ dataset active?  │ ─── no ───► build, save, install ──► Generated
/// └────────┬─────────┘
///          │ yes
///          ▼
/// ┌──────────────────┐
/// │ guard admitted?  │ ─── no ───► GenerationInProgress
/// └────────┬─────────┘
///          │ yes
///          ▼
///   spawn build + save ──► BackgroundStarted
/// ```
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) flips a cancellation flag that every progress callback
/// handed to the builder checks, waits for the background task, then closes the slot.
/// A build or load that finished after the flag was set is unloaded instead of installed,
/// and no background task is spawned once shutdown has started. Dropping the manager
/// without calling it still cancels outstanding work; the background task only holds
/// `Arc`s, so nothing it touches is freed under it.
pub struct DagManager<B: DatasetBuilder> {
    builder: Arc<B>,
    namer: DagFileNamer,
    slot: Arc<ActiveSlot<B::Dataset>>,
    guard: Arc<GenerationGuard>,
    background: Mutex<Option<JoinHandle<()>>>,
    cancelled: Arc<AtomicBool>,
    shutdown_initiated: AtomicBool,
    settings: DagSettings,
}

impl<B: DatasetBuilder> DagManager<B> {
    /// Creates a new builder for constructing a `DagManager`.
    #[must_use]
    pub fn builder() -> DagManagerBuilder<B> {
        DagManagerBuilder::new()
    }

    /// Called by `DagManagerBuilder` once everything is validated.
    pub(super) fn new(builder: Arc<B>, namer: DagFileNamer, settings: DagSettings) -> Self {
        Self {
            builder,
            namer,
            slot: Arc::new(ActiveSlot::new()),
            guard: Arc::new(GenerationGuard::new()),
            background: Mutex::new(None),
            cancelled: Arc::new(AtomicBool::new(false)),
            shutdown_initiated: AtomicBool::new(false),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DagSettings {
        &self.settings
    }

    #[must_use]
    pub fn namer(&self) -> &DagFileNamer {
        &self.namer
    }

    #[must_use]
    pub fn slot(&self) -> &Arc<ActiveSlot<B::Dataset>> {
        &self.slot
    }

    #[must_use]
    pub fn dataset_builder(&self) -> &Arc<B> {
        &self.builder
    }

    /// Snapshot of the active dataset. Re-acquire before each use.
    #[must_use]
    pub fn active(&self) -> Option<Arc<B::Dataset>> {
        self.slot.peek()
    }

    #[must_use]
    pub fn active_epoch(&self) -> Option<u64> {
        self.slot.active_epoch()
    }

    /// Whether a background generation is running.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.guard.is_busy()
    }

    #[inline]
    #[must_use]
    pub fn epoch_of(&self, height: u64) -> u64 {
        self.namer.epoch_of(height)
    }

    #[must_use]
    pub fn path_for(&self, height: u64) -> DagFile {
        self.namer.path_for(height)
    }

    /// Makes sure the dataset for `height` is active, or on its way.
    ///
    /// `callback` receives progress of a foreground load or build and can cancel it by
    /// returning `false`. Background generation does not report to it.
    ///
    /// Failures never propagate as errors: they come back as [`ReadyOutcome::Failed`] and
    /// the next call retries.
    pub async fn ensure_ready(&self, height: u64, callback: ProgressCallback) -> ReadyOutcome {
        if self.cancelled.load(Ordering::Acquire) {
            return ReadyOutcome::Failed(DagError::ShuttingDown);
        }

        let epoch = self.epoch_of(height);
        if self.is_epoch_active(epoch) {
            debug!(epoch, "DAG already active");
            return ReadyOutcome::AlreadyActive { epoch };
        }

        let file = self.namer.path_for(height);
        debug!(epoch, path = %file, "DAG file resolved");

        let mut load_failed = false;
        if file.is_valid(&*self.builder) {
            match self.load_and_install(&file, callback.clone()).await {
                Ok(()) => {
                    info!(epoch, path = %file, "DAG file loaded");
                    return ReadyOutcome::Loaded { epoch };
                }
                Err(err) if err.is_cancelled() => {
                    info!(epoch, "DAG load cancelled");
                    return ReadyOutcome::Failed(err);
                }
                Err(err) => {
                    warn!(
                        epoch,
                        error = %err,
                        "DAG file not loaded, will be generated instead"
                    );
                    load_failed = true;
                }
            }
        }

        self.generate(height, file, callback, load_failed).await
    }

    /// Starts generating the next epoch's dataset in the background when `height` is
    /// within `pregeneration_distance` blocks of the epoch boundary.
    ///
    /// Only runs while a dataset is active; with an empty slot the next
    /// [`ensure_ready`](Self::ensure_ready) generates in the foreground anyway.
    pub async fn prepare_next(&self, height: u64) -> ReadyOutcome {
        if self.cancelled.load(Ordering::Acquire) {
            return ReadyOutcome::Failed(DagError::ShuttingDown);
        }

        let distance = self.settings.pregeneration_distance;
        let epoch_length = self.namer.epoch_length();
        if distance == 0 || epoch_length - height % epoch_length > distance {
            return ReadyOutcome::NotNeeded;
        }
        if self.slot.is_empty() {
            return ReadyOutcome::NotNeeded;
        }

        let next_height =
            self.epoch_of(height).checked_add(1).and_then(|next| next.checked_mul(epoch_length));
        let Some(next_height) = next_height else {
            return ReadyOutcome::NotNeeded;
        };

        let file = self.namer.path_for(next_height);
        if file.is_valid(&*self.builder) {
            debug!(epoch = file.epoch(), "next DAG file already present");
            return ReadyOutcome::FilePresent { epoch: file.epoch() };
        }

        self.ensure_dag_dir();
        self.spawn_background(next_height, file).await
    }

    /// Waits for the outstanding background generation, if any.
    pub async fn wait_for_background(&self) {
        let handle = self.background.lock().await.take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(()) => debug!("background DAG task completed"),
                Err(e) => error!(error = %e, "background DAG task failed"),
            }
        }
    }

    /// Cancels outstanding work, waits for the background task, then releases the resident
    /// dataset and closes the slot to late installs. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("DAG manager shutdown already initiated, ignoring duplicate call");
            return;
        }

        info!("Initiating DAG manager shutdown");
        self.cancelled.store(true, Ordering::Release);
        self.wait_for_background().await;

        // Closing waits for an install in flight, so keep it off the async workers
        let slot = Arc::clone(&self.slot);
        match tokio::task::spawn_blocking(move || slot.close()).await {
            Ok(true) => debug!("resident DAG released"),
            Ok(false) => {}
            Err(e) => error!(error = %e, "closing the DAG slot failed"),
        }
        info!("DAG manager shutdown complete");
    }

    /// Slot and builder agree that `epoch` is loaded.
    fn is_epoch_active(&self, epoch: u64) -> bool {
        if self.slot.active_epoch() != Some(epoch) {
            return false;
        }
        if !self.builder.is_epoch_resident(epoch) {
            warn!(epoch, "active DAG is not resident according to the builder, reloading");
            return false;
        }
        true
    }

    fn cancellable(&self, callback: &ProgressCallback) -> ProgressCallback {
        callback.with_cancellation(Arc::clone(&self.cancelled))
    }

    fn ensure_dag_dir(&self) {
        if let Err(source) = self.namer.ensure_dag_dir() {
            let err = DagError::FileSystemFailure { path: self.namer.dag_dir(), source };
            warn!(error = %err, "could not create DAG directory");
        }
    }

    /// Resets the slot and installs the dataset loaded from `file` in one lock hold.
    async fn load_and_install(
        &self,
        file: &DagFile,
        callback: ProgressCallback,
    ) -> Result<(), DagError> {
        let builder = Arc::clone(&self.builder);
        let slot = Arc::clone(&self.slot);
        let progress = self.cancellable(&callback);
        let path = file.path().to_path_buf();

        tokio::task::spawn_blocking(move || {
            let activation = slot
                .replace_with(|| builder.load(&path, &progress))
                .map_err(|source| DagError::LoadFailure { path, source })?;
            if activation.change.is_none() {
                return Err(DagError::ShuttingDown);
            }
            Ok(())
        })
        .await?
    }

    async fn generate(
        &self,
        height: u64,
        file: DagFile,
        callback: ProgressCallback,
        load_failed: bool,
    ) -> ReadyOutcome {
        let epoch = file.epoch();

        // Another context may have produced the file meanwhile. After a failed load the
        // check is known to be wrong for this file, so it is regenerated instead.
        if !load_failed && file.is_valid(&*self.builder) {
            debug!(epoch, "DAG file already present, nothing to generate");
            return ReadyOutcome::FilePresent { epoch };
        }

        self.ensure_dag_dir();

        if self.slot.is_empty() {
            self.generate_foreground(height, file, callback).await
        } else {
            self.spawn_background(height, file).await
        }
    }

    async fn generate_foreground(
        &self,
        height: u64,
        file: DagFile,
        callback: ProgressCallback,
    ) -> ReadyOutcome {
        let epoch = file.epoch();
        let builder = Arc::clone(&self.builder);
        let slot = Arc::clone(&self.slot);
        let cancelled = Arc::clone(&self.cancelled);
        let progress = self.cancellable(&callback);

        let result = tokio::task::spawn_blocking(move || {
            let (dataset, persisted) = generate_and_save(&*builder, height, &file, &progress)?;
            if cancelled.load(Ordering::Acquire) {
                dataset.unload();
                return Err(DagError::ShuttingDown);
            }
            // A closed slot unloads the dataset itself
            let activation = slot.activate(Some(Arc::new(dataset)), false);
            if activation.change.is_none() {
                return Err(DagError::ShuttingDown);
            }
            Ok(persisted)
        })
        .await
        .map_err(DagError::from)
        .and_then(|inner| inner);

        match result {
            Ok(persisted) => ReadyOutcome::Generated { epoch, persisted },
            Err(err) if err.is_cancelled() => {
                info!(epoch, error = %err, "DAG generation stopped");
                ReadyOutcome::Failed(err)
            }
            Err(err) => {
                error!(epoch, error = %err, kind = err.kind(), "DAG could not be generated");
                ReadyOutcome::Failed(err)
            }
        }
    }

    async fn spawn_background(&self, height: u64, file: DagFile) -> ReadyOutcome {
        let epoch = file.epoch();
        let Some(permit) = self.guard.try_acquire() else {
            debug!(epoch, "DAG generation already in progress, request dropped");
            return ReadyOutcome::GenerationInProgress { epoch };
        };

        let mut background = self.background.lock().await;
        // Shutdown sets the flag before it takes the handle
        if self.cancelled.load(Ordering::Acquire) {
            debug!(epoch, "shutdown in progress, background generation not started");
            return ReadyOutcome::Failed(DagError::ShuttingDown);
        }
        if let Some(previous) = background.take() {
            // The previous task already dropped its permit, so it is at most returning
            if let Err(e) = previous.await {
                warn!(error = %e, "previous background DAG task failed");
            }
        }

        let builder = Arc::clone(&self.builder);
        let install_into =
            self.settings.install_background_result.then(|| Arc::clone(&self.slot));
        let progress = self.cancellable(&ProgressCallback::noop());

        info!(epoch, height, path = %file, "starting background DAG generation");
        *background = Some(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_background_generation(&*builder, height, &file, &progress, install_into.as_deref());
        }));

        ReadyOutcome::BackgroundStarted { epoch }
    }
}

impl<B: DatasetBuilder> Drop for DagManager<B> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
