//! Locations of target configuration and migrations

use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Configuration filenames looked up in a target folder, in order.
pub const CONFIG_FILENAMES: &[&str] = &["cairn.yaml", "cairn.yml", "cairn.json"];

/// Gitignored overrides placed next to the target configuration.
pub const LOCAL_CONFIG_FILENAME: &str = "cairn.local.yaml";

/// Path helpers for a target folder.
pub struct Paths;

impl Paths {
    /// First existing configuration file in the target folder.
    pub fn config_file(target_dir: impl AsRef<Path>) -> Option<PathBuf> {
        let target_dir = target_dir.as_ref();
        CONFIG_FILENAMES
            .iter()
            .map(|name| target_dir.join(name))
            .find(|path| path.is_file())
    }

    /// File written by `init` (cairn.yaml)
    pub fn default_config_file(target_dir: impl AsRef<Path>) -> PathBuf {
        target_dir.as_ref().join(CONFIG_FILENAMES[0])
    }

    /// Local override file (cairn.local.yaml)
    pub fn local_config_file(target_dir: impl AsRef<Path>) -> PathBuf {
        target_dir.as_ref().join(LOCAL_CONFIG_FILENAME)
    }

    /// Absolute form of the target folder.
    pub fn absolute(target_dir: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        let target_dir = target_dir.as_ref();
        std::path::absolute(target_dir).map_err(|source| ConfigError::PathError {
            path: target_dir.to_path_buf(),
            source,
        })
    }

    /// Migrations live in the parent of the target folder.
    pub fn migrations_dir(target_dir: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        let target = Self::absolute(target_dir)?;
        Ok(target.parent().map_or_else(|| target.clone(), Path::to_path_buf))
    }

    /// Check if a target has a configuration file
    pub fn is_initialized(target_dir: impl AsRef<Path>) -> bool {
        Self::config_file(target_dir).is_some()
    }
}
