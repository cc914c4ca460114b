use super::errors::DagError;

/// Result of a readiness request.
#[derive(Debug)]
pub enum ReadyOutcome {
    /// The active dataset already belongs to the requested epoch.
    AlreadyActive { epoch: u64 },
    /// A valid file was loaded and installed.
    Loaded { epoch: u64 },
    /// The dataset was generated on the caller's context and installed. `persisted` is
    /// `false` if saving failed; the dataset is still active.
    Generated { epoch: u64, persisted: bool },
    /// A background generation was started; the previous dataset keeps serving.
    BackgroundStarted { epoch: u64 },
    /// Another background generation is already running; the request was dropped.
    GenerationInProgress { epoch: u64 },
    /// A valid file already exists and nothing needed generating.
    FilePresent { epoch: u64 },
    /// Look-ahead generation was not due.
    NotNeeded,
    /// The attempt failed; the next call retries.
    Failed(DagError),
}

impl ReadyOutcome {
    /// `true` if this call loaded or generated a dataset (or started doing so).
    #[must_use]
    pub fn action_taken(&self) -> bool {
        matches!(
            self,
            Self::Loaded { .. } | Self::Generated { .. } | Self::BackgroundStarted { .. }
        )
    }

    /// Epoch the outcome refers to, if any.
    #[must_use]
    pub fn epoch(&self) -> Option<u64> {
        match *self {
            Self::AlreadyActive { epoch }
            | Self::Loaded { epoch }
            | Self::Generated { epoch, .. }
            | Self::BackgroundStarted { epoch }
            | Self::GenerationInProgress { epoch }
            | Self::FilePresent { epoch } => Some(epoch),
            Self::NotNeeded | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the error for a failed outcome.
    #[must_use]
    pub fn error(&self) -> Option<&DagError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}
