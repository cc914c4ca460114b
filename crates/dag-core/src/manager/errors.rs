use crate::dataset::DatasetError;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;

/// Failures surfaced by the lifecycle manager.
///
/// None of these are fatal. Each one leaves the active slot and the generation guard
/// consistent and the next [`ensure_ready`](super::DagManager::ensure_ready) call retries.
#[derive(Debug, Error)]
pub enum DagError {
    /// The builder failed (or was cancelled) while generating a dataset.
    #[error("DAG for epoch {epoch} could not be generated: {source}")]
    BuildFailure {
        epoch: u64,
        #[source]
        source: DatasetError,
    },

    /// A file that passed the corruption check could not be loaded.
    #[error("DAG file {} could not be loaded: {source}", .path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },

    /// Directory creation or saving failed.
    #[error("filesystem operation on {} failed: {source}", .path.display())]
    FileSystemFailure {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },

    /// A blocking task panicked or was aborted.
    #[error("DAG task failed: {0}")]
    TaskFailure(String),

    /// The manager is shutting down and no longer starts work.
    #[error("DAG manager is shutting down")]
    ShuttingDown,
}

impl DagError {
    /// Returns `true` if the failure came from the progress callback asking to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::BuildFailure { source, .. } | Self::LoadFailure { source, .. } => {
                source.is_cancelled()
            }
            Self::ShuttingDown => true,
            Self::FileSystemFailure { .. } | Self::TaskFailure(_) => false,
        }
    }

    /// Static label for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BuildFailure { .. } => "build_failure",
            Self::LoadFailure { .. } => "load_failure",
            Self::FileSystemFailure { .. } => "filesystem_failure",
            Self::TaskFailure(_) => "task_failure",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

impl From<JoinError> for DagError {
    fn from(err: JoinError) -> Self {
        if err.is_cancelled() {
            Self::TaskFailure("task cancelled".to_string())
        } else {
            Self::TaskFailure(format!("task panicked: {err}"))
        }
    }
}
