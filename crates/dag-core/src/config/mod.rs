//! Configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `DAG_CONFIG` env var
//! 3. **Environment variables**: `DAG__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`DagSettings`]: data directory, epoch length, pre-generation and install policy
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [dag]
//! data_dir = "/var/lib/miner"
//! epoch_length = 30000
//! pregeneration_distance = 400
//! install_background_result = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::dataset::{DataDirResolver, DefaultDataDir, FixedDataDir, DEFAULT_EPOCH_LENGTH};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, sync::Arc};

pub use config::ConfigError;

/// Dataset lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagSettings {
    /// Root directory for dataset files. When unset, the OS convention for `app_name` is
    /// used (see [`DefaultDataDir`]).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Application name used by the default data directory. Defaults to `"DagKeeper"`.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Blocks per epoch. Must be greater than 0. Defaults to `30000`.
    #[serde(default = "default_epoch_length")]
    pub epoch_length: u64,

    /// How many blocks before an epoch boundary the next dataset starts generating in the
    /// background. `0` disables look-ahead generation. Defaults to `400`.
    #[serde(default = "default_pregeneration_distance")]
    pub pregeneration_distance: u64,

    /// Install a background-generated dataset into the active slot as soon as it is
    /// saved, instead of only writing it to disk. Defaults to `false`.
    #[serde(default)]
    pub install_background_result: bool,
}

fn default_app_name() -> String {
    "DagKeeper".to_string()
}

fn default_epoch_length() -> u64 {
    DEFAULT_EPOCH_LENGTH
}

fn default_pregeneration_distance() -> u64 {
    400
}

impl Default for DagSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            app_name: default_app_name(),
            epoch_length: DEFAULT_EPOCH_LENGTH,
            pregeneration_distance: default_pregeneration_distance(),
            install_background_result: false,
        }
    }
}

impl DagSettings {
    /// Returns the resolver for the configured data directory.
    #[must_use]
    pub fn data_dir_resolver(&self) -> Arc<dyn DataDirResolver> {
        match &self.data_dir {
            Some(dir) => Arc::new(FixedDataDir::new(dir.clone())),
            None => Arc::new(DefaultDataDir::new(self.app_name.clone())),
        }
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if the epoch length is zero, the pre-generation
    /// distance does not fit inside an epoch, or the app name is empty while no data
    /// directory is configured.
    pub fn validate(&self) -> Result<(), String> {
        if self.epoch_length == 0 {
            return Err("Epoch length must be greater than 0".to_string());
        }

        if self.pregeneration_distance >= self.epoch_length {
            return Err(format!(
                "Pre-generation distance {} must be smaller than the epoch length {}",
                self.pregeneration_distance, self.epoch_length
            ));
        }

        if self.data_dir.is_none() && self.app_name.trim().is_empty() {
            return Err("App name must not be empty when no data directory is set".to_string());
        }

        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Root configuration.
///
/// Environment overrides use the `DAG` prefix with `__` as separator, e.g.
/// `DAG__DAG__EPOCH_LENGTH=100`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagConfig {
    #[serde(default)]
    pub dag: DagSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DagConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error; defaults and environment overrides still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("dag.app_name", default_app_name())?
            .set_default("dag.epoch_length", DEFAULT_EPOCH_LENGTH)?
            .set_default("dag.pregeneration_distance", default_pregeneration_distance())?
            .set_default("dag.install_background_result", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("DAG").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/dag.toml`, or the path in `DAG_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("DAG_CONFIG").unwrap_or_else(|_| "config/dag.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        self.dag.validate()?;

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
