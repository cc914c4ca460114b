//! Progress reporting and cooperative cancellation.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

type ProgressFn = dyn Fn(u64, u64, i32) -> bool + Send + Sync;

/// Callback invoked by builders as work advances.
///
/// Arguments are `(done, total, phase)`. Returning `false` asks the builder to abort; the
/// aborted operation surfaces as [`DatasetError::Cancelled`](super::DatasetError::Cancelled).
///
/// Cloning is cheap, the closure is reference counted.
#[derive(Clone)]
pub struct ProgressCallback {
    inner: Arc<ProgressFn>,
}

impl ProgressCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u64, u64, i32) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// A callback that ignores progress and never cancels.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_, _, _| true)
    }

    /// Reports progress. Returns `false` if the operation should stop.
    #[inline]
    #[must_use]
    pub fn report(&self, done: u64, total: u64, phase: i32) -> bool {
        (self.inner)(done, total, phase)
    }

    /// Wraps this callback so it also returns `false` once `cancelled` is set.
    ///
    /// The flag is checked before the wrapped callback runs.
    #[must_use]
    pub fn with_cancellation(&self, cancelled: Arc<AtomicBool>) -> Self {
        let inner = Arc::clone(&self.inner);
        Self::new(move |done, total, phase| {
            !cancelled.load(Ordering::Acquire) && inner(done, total, phase)
        })
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCallback").finish_non_exhaustive()
    }
}
