//! Blocking generation steps shared by the foreground and background paths.
//!
//! Everything here runs on `tokio::task::spawn_blocking` threads.

use super::errors::DagError;
use crate::{
    dataset::{Dataset, DatasetBuilder, ProgressCallback},
    naming::DagFile,
    slot::ActiveSlot,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Builds the dataset for `height` and saves it to `file`.
///
/// A failed save is logged and reported through the returned flag; the dataset itself is
/// still usable.
pub(super) fn generate_and_save<B: DatasetBuilder>(
    builder: &B,
    height: u64,
    file: &DagFile,
    progress: &ProgressCallback,
) -> Result<(B::Dataset, bool), DagError> {
    let epoch = file.epoch();
    info!(epoch, height, "generating DAG");

    let dataset =
        builder.build(height, progress).map_err(|source| DagError::BuildFailure { epoch, source })?;

    let persisted = match builder.save(&dataset, file.path()) {
        Ok(()) => {
            info!(epoch, path = %file, "DAG generated and saved");
            true
        }
        Err(source) => {
            let err = DagError::FileSystemFailure { path: file.path().to_path_buf(), source };
            warn!(epoch, error = %err, "DAG generated but could not be persisted");
            false
        }
    };

    Ok((dataset, persisted))
}

/// Body of the background generation task.
///
/// With `install_into` set the result replaces the active dataset; otherwise it is
/// released right after saving and a later readiness check loads it from disk.
pub(super) fn run_background_generation<B: DatasetBuilder>(
    builder: &B,
    height: u64,
    file: &DagFile,
    progress: &ProgressCallback,
    install_into: Option<&ActiveSlot<B::Dataset>>,
) {
    let epoch = file.epoch();

    match generate_and_save(builder, height, file, progress) {
        Ok((dataset, persisted)) => match install_into {
            Some(slot) => {
                if slot.activate(Some(Arc::new(dataset)), false).change.is_some() {
                    info!(epoch, persisted, "background DAG generation finished and installed");
                } else {
                    info!(epoch, persisted, "background DAG generation finished, slot closed");
                }
            }
            None => {
                dataset.unload();
                info!(epoch, persisted, "background DAG generation finished");
            }
        },
        Err(err) if err.is_cancelled() => {
            info!(epoch, "background DAG generation cancelled");
        }
        Err(err) => {
            error!(epoch, error = %err, kind = err.kind(), "background DAG generation failed");
        }
    }
}
