//! CLI command implementations.

pub mod force;
pub mod init;
pub mod migrate;
pub mod new;
pub mod target;

use std::path::PathBuf;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub migrations: Option<PathBuf>,
}
