//! Single-flight guard for background DAG generation.
//!
//! [`GenerationGuard`] is a single flag: set while a background generation runs, clear
//! otherwise. There is no queue. A caller that loses the race simply drops its request;
//! the next readiness check re-runs the decision from scratch.
//!
//! # RAII Permit
//!
//! [`GenerationGuard::try_acquire`] returns a [`GenerationPermit`] whose `Drop` calls
//! [`GenerationGuard::end`]. Moving the permit into the generation task makes the task the
//! only writer of "generation finished", and the flag is cleared on every exit path,
//! including a panicking builder.
//!
//! ```text
//! try_acquire() ── flag already set ──► None (request dropped)
//!      │
//!      │ flag was clear, now set
//!      ▼
//! GenerationPermit ──► moved into background task
//!                            │
//!                  build / save / (install)
//!                            │
//!                 task returns or unwinds
//!                            │
//!                            ▼
//!                  Drop ──► end(): flag cleared
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::trace;

/// Admission flag for background generation.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    busy: AtomicBool,
}

impl GenerationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self { busy: AtomicBool::new(false) }
    }

    /// Sets the flag if it was clear. Returns `false`, leaving the flag untouched, if a
    /// generation is already running.
    pub fn try_begin(&self) -> bool {
        let admitted =
            self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok();
        trace!(admitted, "generation guard admission");
        admitted
    }

    /// Clears the flag unconditionally.
    ///
    /// Must be called exactly once per successful [`try_begin`](Self::try_begin). Prefer
    /// [`try_acquire`](Self::try_acquire), which does this on drop.
    pub fn end(&self) {
        self.busy.store(false, Ordering::Release);
        trace!("generation guard released");
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// RAII form of [`try_begin`](Self::try_begin).
    #[must_use]
    pub fn try_acquire(self: &Arc<Self>) -> Option<GenerationPermit> {
        self.try_begin().then(|| GenerationPermit { guard: Arc::clone(self) })
    }
}

/// Proof of admission. Clears the guard when dropped.
#[must_use = "dropping the permit immediately releases the generation guard"]
#[derive(Debug)]
pub struct GenerationPermit {
    guard: Arc<GenerationGuard>,
}

impl Drop for GenerationPermit {
    fn drop(&mut self) {
        self.guard.end();
    }
}
