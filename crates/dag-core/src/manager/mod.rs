//! DAG lifecycle orchestration.
//!
//! [`DagManager`] decides, for a requested height, whether the active dataset already
//! covers it, whether a valid file can be loaded, or whether the dataset has to be
//! generated: in the foreground when nothing is active, in the background while the
//! current dataset keeps serving.
//!
//! - `builder`: [`DagManagerBuilder`] and its error type
//! - `lifecycle`: the manager itself, readiness decisions and shutdown
//! - `generation`: blocking build-and-save steps
//! - `outcome`: [`ReadyOutcome`]
//! - `errors`: [`DagError`]
//!
//! # Example
//!
//! ```ignore
//! use dag_core::{config::DagConfig, dataset::ProgressCallback, manager::DagManager};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(
//!     DagManager::builder()
//!         .with_config(&DagConfig::load()?)
//!         .with_dataset_builder(builder)
//!         .with_seed_provider(seed_for_height)
//!         .build()?,
//! );
//!
//! // On every new block
//! let outcome = manager.ensure_ready(height, ProgressCallback::noop()).await;
//! manager.prepare_next(height).await;
//!
//! // Before exit
//! manager.shutdown().await;
//! ```

pub mod builder;
pub mod errors;
mod generation;
pub mod lifecycle;
pub mod outcome;

pub use builder::{DagManagerBuilder, ManagerBuildError};
pub use errors::DagError;
pub use lifecycle::DagManager;
pub use outcome::ReadyOutcome;
