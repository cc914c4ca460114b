//! # DAG Core
//!
//! Lifecycle manager for the epoch-keyed, memory-hard datasets ("DAGs") used by
//! proof-of-work hashing.
//!
//! This crate provides:
//!
//! - **[`manager`]**: readiness decisions for a block height: keep, load from disk, generate
//!   in the foreground, or generate in the background while the current DAG keeps serving.
//!
//! - **[`slot`]**: the single active-dataset slot with atomic replace-and-unload.
//!
//! - **[`guard`]**: single-flight admission for background generation.
//!
//! - **[`naming`]**: deterministic `<epoch>-<seed prefix>.dag` file paths and the validity
//!   check.
//!
//! - **[`dataset`]**: traits for the external builder, seed hash provider and data
//!   directory.
//!
//! - **[`config`]** and **[`logging`]**: layered configuration and tracing setup.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      DagManager                      │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌──────────┐ │
//! │  │  ActiveSlot  │  │ GenerationGuard │  │ DagFile  │ │
//! │  │ (one mutex)  │  │  (single flag)  │  │  Namer   │ │
//! │  └──────┬───────┘  └────────┬────────┘  └────┬─────┘ │
//! └─────────┼───────────────────┼────────────────┼───────┘
//!           │                   │                │
//!           ▼                   ▼                ▼
//!     Dataset::unload    background task   SeedHashProvider
//!                        (spawn_blocking)  DataDirResolver
//!                               │
//!                               ▼
//!                        DatasetBuilder
//!                   build / load / save / is_corrupted
//! ```

pub mod config;
pub mod dataset;
pub mod guard;
pub mod logging;
pub mod manager;
pub mod naming;
pub mod slot;


pub use manager::{DagError, DagManager, ReadyOutcome};
