//! Deterministic dataset file naming and validity.
//!
//! A dataset for epoch `E` with seed hash `S` lives at
//! `<data_dir>/dag/<E as 4-digit hex>-<first 12 hex chars of S>.dag`. The path is a pure
//! function of the height (given the data directory and seed provider) and is never
//! stored; callers recompute it whenever they need it.

use crate::dataset::{DataDirResolver, DatasetBuilder, DatasetError, SeedHash, SeedHashProvider};
use std::{
    fmt,
    num::NonZeroU64,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Subdirectory of the data directory holding dataset files.
pub const DAG_SUBDIR: &str = "dag";

/// File extension of dataset files.
pub const DAG_EXTENSION: &str = "dag";

/// Number of seed hash hex characters in a file name.
pub const SEED_PREFIX_LEN: usize = 12;

/// Formats the file name for an epoch and seed hash.
///
/// Epochs wider than four hex digits are printed in full.
#[must_use]
pub fn file_name(epoch: u64, seed: &SeedHash) -> String {
    format!("{epoch:04x}-{}.{DAG_EXTENSION}", seed.hex_prefix(SEED_PREFIX_LEN))
}

/// Location of the dataset file for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DagFile {
    epoch: u64,
    path: PathBuf,
}

impl DagFile {
    #[must_use]
    pub fn new(epoch: u64, path: PathBuf) -> Self {
        Self { epoch, path }
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file on disk passes the builder's corruption check.
    ///
    /// Missing and structurally invalid files are both reported as not valid.
    pub fn is_valid<B: DatasetBuilder + ?Sized>(&self, builder: &B) -> bool {
        !builder.is_corrupted(&self.path)
    }
}

impl fmt::Display for DagFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Maps heights to dataset files.
#[derive(Clone)]
pub struct DagFileNamer {
    data_dir: Arc<dyn DataDirResolver>,
    seeds: Arc<dyn SeedHashProvider>,
    epoch_length: NonZeroU64,
}

impl DagFileNamer {
    pub fn new(
        data_dir: Arc<dyn DataDirResolver>,
        seeds: Arc<dyn SeedHashProvider>,
        epoch_length: NonZeroU64,
    ) -> Self {
        Self { data_dir, seeds, epoch_length }
    }

    #[must_use]
    pub fn epoch_length(&self) -> u64 {
        self.epoch_length.get()
    }

    #[inline]
    #[must_use]
    pub fn epoch_of(&self, height: u64) -> u64 {
        height / self.epoch_length
    }

    /// Directory holding all dataset files.
    #[must_use]
    pub fn dag_dir(&self) -> PathBuf {
        self.data_dir.data_dir().join(DAG_SUBDIR)
    }

    /// Returns the dataset file for the epoch containing `height`.
    #[must_use]
    pub fn path_for(&self, height: u64) -> DagFile {
        let epoch = self.epoch_of(height);
        let seed = self.seeds.seed_hash(height);
        DagFile::new(epoch, self.dag_dir().join(file_name(epoch, &seed)))
    }

    /// Creates the dataset directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Io`] if the directory cannot be created.
    pub fn ensure_dag_dir(&self) -> Result<PathBuf, DatasetError> {
        let dir = self.dag_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl fmt::Debug for DagFileNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DagFileNamer")
            .field("dag_dir", &self.dag_dir())
            .field("epoch_length", &self.epoch_length)
            .finish_non_exhaustive()
    }
}
