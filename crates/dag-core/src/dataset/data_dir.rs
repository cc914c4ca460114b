//! Data directory resolution.
//!
//! Dataset files live under `<data_dir>/dag/`. The directory itself is resolved on demand
//! through [`DataDirResolver`] so hosts can plug in their own convention.

use std::path::PathBuf;

/// Resolves the root directory for persisted datasets.
pub trait DataDirResolver: Send + Sync {
    fn data_dir(&self) -> PathBuf;
}

/// Always returns the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDataDir(PathBuf);

impl FixedDataDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl DataDirResolver for FixedDataDir {
    fn data_dir(&self) -> PathBuf {
        self.0.clone()
    }
}

/// OS-convention data directory for an application name.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Windows  | `%APPDATA%/<app_name>` |
/// | macOS    | `$HOME/Library/Application Support/<app_name>` |
/// | other    | `$HOME/.<app_name lowercased>` |
///
/// An unset or empty `HOME` (or `APPDATA`) falls back to `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultDataDir {
    app_name: String,
}

impl DefaultDataDir {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self { app_name: app_name.into() }
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
}

fn env_dir(var: &str) -> PathBuf {
    match std::env::var_os(var) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from("/"),
    }
}

impl DataDirResolver for DefaultDataDir {
    fn data_dir(&self) -> PathBuf {
        if cfg!(target_os = "windows") {
            env_dir("APPDATA").join(&self.app_name)
        } else if cfg!(target_os = "macos") {
            env_dir("HOME").join("Library").join("Application Support").join(&self.app_name)
        } else {
            env_dir("HOME").join(format!(".{}", self.app_name.to_lowercase()))
        }
    }
}
