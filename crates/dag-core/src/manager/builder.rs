//! Builder pattern for constructing a [`DagManager`].

use super::lifecycle::DagManager;
use crate::{
    config::{DagConfig, DagSettings},
    dataset::{DataDirResolver, DatasetBuilder, SeedHashProvider},
    naming::DagFileNamer,
};
use std::{num::NonZeroU64, sync::Arc};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while building a manager.
#[derive(Debug, Error)]
pub enum ManagerBuildError {
    /// Settings validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// No dataset builder was supplied
    #[error("No dataset builder provided")]
    MissingDatasetBuilder,

    /// No seed hash provider was supplied
    #[error("No seed hash provider provided")]
    MissingSeedProvider,
}

/// Builder for [`DagManager`].
///
/// # Examples
///
/// ```ignore
/// let manager = DagManager::builder()
///     .with_config(&DagConfig::load()?)
///     .with_dataset_builder(NrgHashBuilder::new())
///     .with_seed_provider(|height| seed_for(height))
///     .build()?;
/// ```
pub struct DagManagerBuilder<B: DatasetBuilder> {
    config: DagConfig,
    dataset_builder: Option<Arc<B>>,
    seeds: Option<Arc<dyn SeedHashProvider>>,
    data_dir: Option<Arc<dyn DataDirResolver>>,
}

impl<B: DatasetBuilder> DagManagerBuilder<B> {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self { config: DagConfig::default(), dataset_builder: None, seeds: None, data_dir: None }
    }

    /// Uses the whole configuration. Every section is validated in [`build`](Self::build).
    #[must_use]
    pub fn with_config(mut self, config: &DagConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Replaces only the `dag` section.
    #[must_use]
    pub fn with_settings(mut self, settings: DagSettings) -> Self {
        self.config.dag = settings;
        self
    }

    #[must_use]
    pub fn with_dataset_builder(self, builder: B) -> Self {
        self.with_shared_dataset_builder(Arc::new(builder))
    }

    /// Uses a builder the caller keeps a handle to.
    #[must_use]
    pub fn with_shared_dataset_builder(mut self, builder: Arc<B>) -> Self {
        self.dataset_builder = Some(builder);
        self
    }

    #[must_use]
    pub fn with_seed_provider(mut self, seeds: impl SeedHashProvider + 'static) -> Self {
        self.seeds = Some(Arc::new(seeds));
        self
    }

    /// Overrides the data directory derived from the settings.
    #[must_use]
    pub fn with_data_dir(mut self, resolver: impl DataDirResolver + 'static) -> Self {
        self.data_dir = Some(Arc::new(resolver));
        self
    }

    /// Validates the configuration and assembles the manager.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerBuildError`] if the configuration is invalid or the dataset builder
    /// or seed provider is missing.
    pub fn build(self) -> Result<DagManager<B>, ManagerBuildError> {
        self.config.validate().map_err(ManagerBuildError::ConfigValidation)?;
        let settings = self.config.dag;
        let epoch_length = NonZeroU64::new(settings.epoch_length).ok_or_else(|| {
            ManagerBuildError::ConfigValidation("Epoch length must be greater than 0".to_string())
        })?;

        let dataset_builder = self.dataset_builder.ok_or(ManagerBuildError::MissingDatasetBuilder)?;
        let seeds = self.seeds.ok_or(ManagerBuildError::MissingSeedProvider)?;
        let data_dir = self.data_dir.unwrap_or_else(|| settings.data_dir_resolver());

        let namer = DagFileNamer::new(data_dir, seeds, epoch_length);

        info!(
            dag_dir = %namer.dag_dir().display(),
            epoch_length = settings.epoch_length,
            pregeneration_distance = settings.pregeneration_distance,
            install_background_result = settings.install_background_result,
            "Initializing DAG manager"
        );

        Ok(DagManager::new(dataset_builder, namer, settings))
    }
}

impl<B: DatasetBuilder> Default for DagManagerBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}
