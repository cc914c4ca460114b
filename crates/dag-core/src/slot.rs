//! The active dataset slot.
//!
//! `ActiveSlot` holds at most one resident [`Dataset`]. Installing a dataset always unloads
//! the one it replaces. Only one DAG stays in memory at a time; the price is that switching
//! back to an older epoch means loading or generating it again.
//!
//! # Lock Discipline
//!
//! Two locks, always taken in this order:
//!
//! - `writer` serializes every mutation. It is held for a whole reset-load-install, so no
//!   other install can interleave with it.
//! - `active` guards the stored `Arc` and is only held for the swap itself. Readers take
//!   nothing else, so they never wait on a load or an unload.
//!
//! ```text
//! activate(candidate, force_reset)      replace_with(loader)
//!         │                                     │
//!         ▼                                     ▼
//!   ┌─────────────┐                       ┌─────────────┐
//!   │ writer lock │                       │ writer lock │
//!   └──────┬──────┘                       └──────┬──────┘
//!          │ force_reset?                        │ take + unload
//!          ▼                                     ▼
//!    take + unload                         loader() ── Err ──► slot empty
//!          │                                     │ Ok
//!          ▼                                     ▼
//!    swap candidate                        swap result
//!    unload previous                             │
//!          │                                     ▼
//!          ▼                                  unlock
//!       unlock
//! ```
//!
//! While `replace_with` loads, readers see an empty slot.
//!
//! # Closing
//!
//! [`close`](ActiveSlot::close) releases the resident dataset and makes every later install
//! a no-op that unloads the candidate instead. Work that was already running when the
//! owner shut down therefore cannot leave a dataset behind.

use crate::dataset::Dataset;
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::info;

/// What an install did to the active epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochChange {
    /// The slot was empty before.
    Installed { epoch: u64 },
    /// The previous dataset belonged to another epoch.
    Swapped { from: u64, to: u64 },
    /// A new instance replaced one of the same epoch.
    Refreshed { epoch: u64 },
}

impl EpochChange {
    /// Epoch of the dataset now installed.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        match *self {
            Self::Installed { epoch } | Self::Refreshed { epoch } => epoch,
            Self::Swapped { to, .. } => to,
        }
    }
}

/// Result of [`ActiveSlot::activate`].
pub struct Activation<D> {
    /// Dataset active after the call, if any.
    pub active: Option<Arc<D>>,
    /// Set when a candidate was installed. `None` for a closed slot.
    pub change: Option<EpochChange>,
}

impl<D> Activation<D> {
    fn rejected() -> Self {
        Self { active: None, change: None }
    }
}

impl<D> fmt::Debug for Activation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("active", &self.active.is_some())
            .field("change", &self.change)
            .finish()
    }
}

/// Single-resident holder of the active dataset.
///
/// # Ownership
///
/// The slot owns the installed dataset. [`peek`](Self::peek) hands out an `Arc` snapshot
/// that stays valid only until the next install: the slot unloads the dataset it evicts
/// even while snapshots are still alive, so callers re-acquire before each use rather than
/// holding on to one.
pub struct ActiveSlot<D: Dataset> {
    writer: Mutex<()>,
    active: Mutex<Option<Arc<D>>>,
    closed: AtomicBool,
}

impl<D: Dataset> ActiveSlot<D> {
    #[must_use]
    pub fn new() -> Self {
        Self { writer: Mutex::new(()), active: Mutex::new(None), closed: AtomicBool::new(false) }
    }

    /// Optionally resets the slot, then installs `candidate`.
    ///
    /// With `force_reset`, the active dataset is unloaded and cleared first, regardless of
    /// `candidate`. A present `candidate` replaces whatever is active and the replaced
    /// dataset is unloaded. Returns a view of the slot after the call.
    ///
    /// On a closed slot nothing is installed: the candidate is unloaded and the returned
    /// activation is empty.
    pub fn activate(&self, candidate: Option<Arc<D>>, force_reset: bool) -> Activation<D> {
        let _writer = self.writer.lock();

        if self.is_closed() {
            if let Some(candidate) = candidate {
                discard(&candidate);
            }
            return Activation::rejected();
        }

        if force_reset {
            let previous = self.active.lock().take();
            if let Some(previous) = previous {
                release(&previous);
            }
        }

        let change = candidate.map(|next| self.install(next));
        Activation { active: self.peek(), change }
    }

    /// Unloads the active dataset and installs the one produced by `loader`. No other
    /// install can run in between.
    ///
    /// On a closed slot the loader is not called and an empty activation is returned.
    ///
    /// # Errors
    ///
    /// Returns the loader's error unchanged. The previous dataset has already been
    /// released at that point and the slot stays empty.
    pub fn replace_with<F, E>(&self, loader: F) -> Result<Activation<D>, E>
    where
        F: FnOnce() -> Result<D, E>,
    {
        let _writer = self.writer.lock();
        if self.is_closed() {
            return Ok(Activation::rejected());
        }

        let previous = self.active.lock().take();
        if let Some(previous) = previous {
            release(&previous);
        }

        let loaded = Arc::new(loader()?);
        let change = self.install(loaded);
        Ok(Activation { active: self.peek(), change: Some(change) })
    }

    /// Returns the active dataset, if any.
    #[must_use]
    pub fn peek(&self) -> Option<Arc<D>> {
        self.active.lock().clone()
    }

    #[must_use]
    pub fn active_epoch(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|d| d.epoch())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.lock().is_none()
    }

    /// Unloads and clears the active dataset. Returns `true` if one was released.
    pub fn clear(&self) -> bool {
        let _writer = self.writer.lock();
        self.take_and_release()
    }

    /// Clears the slot and refuses every later install. Returns `true` if a dataset was
    /// released. Waits for an install or load in progress to finish first.
    pub fn close(&self) -> bool {
        let _writer = self.writer.lock();
        self.closed.store(true, Ordering::Release);
        self.take_and_release()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take_and_release(&self) -> bool {
        let previous = self.active.lock().take();
        match previous {
            Some(dataset) => {
                release(&dataset);
                true
            }
            None => false,
        }
    }

    /// Swaps `next` in and unloads what it replaced. Caller holds `writer`.
    fn install(&self, next: Arc<D>) -> EpochChange {
        let new_epoch = next.epoch();
        let previous = self.active.lock().replace(Arc::clone(&next));

        let change = match &previous {
            None => EpochChange::Installed { epoch: new_epoch },
            Some(p) if p.epoch() != new_epoch => {
                EpochChange::Swapped { from: p.epoch(), to: new_epoch }
            }
            Some(_) => EpochChange::Refreshed { epoch: new_epoch },
        };

        match change {
            EpochChange::Swapped { from, to } => {
                info!(previous_epoch = from, epoch = to, "DAG swapped to new epoch");
            }
            EpochChange::Installed { epoch } | EpochChange::Refreshed { epoch } => {
                info!(epoch, "DAG activated");
            }
        }

        // Re-installing the instance that is already active must not unload it
        if let Some(previous) = previous.filter(|p| !Arc::ptr_eq(p, &next)) {
            release(&previous);
        }
        change
    }
}

fn release<D: Dataset>(dataset: &Arc<D>) {
    dataset.unload();
    info!(epoch = dataset.epoch(), "DAG unloaded");
}

fn discard<D: Dataset>(dataset: &Arc<D>) {
    dataset.unload();
    info!(epoch = dataset.epoch(), "DAG discarded, slot is closed");
}

impl<D: Dataset> Default for ActiveSlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dataset> Drop for ActiveSlot<D> {
    fn drop(&mut self) {
        if let Some(resident) = self.active.get_mut().take() {
            release(&resident);
        }
    }
}

impl<D: Dataset> fmt::Debug for ActiveSlot<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSlot")
            .field("active_epoch", &self.active_epoch())
            .field("closed", &self.is_closed())
            .finish()
    }
}
