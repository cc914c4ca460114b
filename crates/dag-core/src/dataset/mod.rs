//! External dataset interfaces.
//!
//! The hash function that actually fills a DAG is not part of this crate. It is consumed
//! through the [`DatasetBuilder`] trait, which builds, loads, saves and validates datasets,
//! and the [`Dataset`] trait, which exposes the epoch of a built dataset and its explicit
//! release.
//!
//! The remaining collaborators live in submodules:
//!
//! - [`progress`]: the progress callback doubling as the cancellation channel
//! - [`seed`]: seed hash type and provider trait
//! - [`data_dir`]: data directory resolution

pub mod data_dir;
pub mod progress;
pub mod seed;

pub use data_dir::{DataDirResolver, DefaultDataDir, FixedDataDir};
pub use progress::ProgressCallback;
pub use seed::{SeedHash, SeedHashProvider};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of blocks sharing one dataset.
pub const DEFAULT_EPOCH_LENGTH: u64 = 30_000;

/// Errors reported by a [`DatasetBuilder`].
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The builder could not produce a dataset for the given height.
    #[error("dataset build failed for height {height}: {reason}")]
    Build { height: u64, reason: String },

    /// The file exists but its content could not be parsed.
    #[error("dataset file {} could not be loaded: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    /// The dataset could not be written to disk.
    #[error("dataset could not be saved to {}: {reason}", .path.display())]
    Save { path: PathBuf, reason: String },

    /// The progress callback returned `false`.
    #[error("dataset operation cancelled by progress callback")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    /// Returns `true` if the operation stopped because the progress callback asked it to.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// An in-memory DAG for one epoch.
///
/// Datasets are immutable once built. Releasing the memory is explicit: the active slot
/// calls [`Dataset::unload`] when it evicts a dataset, and implementations are expected to
/// make a second call a no-op.
pub trait Dataset: Send + Sync + 'static {
    /// Epoch this dataset was built for.
    fn epoch(&self) -> u64;

    /// Releases the dataset's memory.
    fn unload(&self);
}

/// Builds, persists and validates datasets.
///
/// Every method is blocking. The manager calls them from `tokio::task::spawn_blocking`.
pub trait DatasetBuilder: Send + Sync + 'static {
    type Dataset: Dataset;

    /// Generates the dataset for the epoch containing `height`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Cancelled`] if `progress` returned `false`, or
    /// [`DatasetError::Build`] for any other failure.
    fn build(&self, height: u64, progress: &ProgressCallback)
        -> Result<Self::Dataset, DatasetError>;

    /// Loads a previously saved dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Load`] for unreadable or truncated content and
    /// [`DatasetError::Cancelled`] if `progress` returned `false`.
    fn load(&self, path: &Path, progress: &ProgressCallback)
        -> Result<Self::Dataset, DatasetError>;

    /// Writes `dataset` to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Save`] or [`DatasetError::Io`] if the file cannot be written.
    fn save(&self, dataset: &Self::Dataset, path: &Path) -> Result<(), DatasetError>;

    /// Cheap structural check of an on-disk dataset. Missing files are corrupted.
    fn is_corrupted(&self, path: &Path) -> bool;

    /// Whether a dataset for `epoch` is currently loaded in memory.
    fn is_epoch_resident(&self, epoch: u64) -> bool;
}
