//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No cairn.yaml, cairn.yml or cairn.json found in {0}")]
    NotFound(PathBuf),

    #[error("Failed to resolve path {path}: {source}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
