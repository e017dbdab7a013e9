//! Error types for the migration engine.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The section of a migration being executed when something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Do,
    Undo,
    View,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Do => "do",
            Self::Undo => "undo",
            Self::View => "view",
        })
    }
}

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration document could not be parsed.
    #[error("Failed to parse migration file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Migrations directory could not be read.
    #[error("Failed to read migrations from {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A referenced migration file does not exist.
    #[error("no such migration (wrong project?, git pull?): {0}")]
    NotFound(PathBuf),

    /// Condition failed to compile or did not yield a boolean.
    #[error("Failed to evaluate condition `{expression}`: {reason}")]
    Eval { expression: String, reason: String },

    /// Command section exited non-zero.
    #[error("Command section failed ({}):\n{output}", exit_label(.code))]
    Execution { code: Option<i32>, output: String },

    /// Loading or saving the applied-migration pointer failed.
    #[error("State store error: {0}")]
    StateStore(String),

    /// The stop migration given by the operator is not among pending migrations.
    #[error("No such migration file: {0}")]
    BoundNotFound(String),

    /// `down` was requested but nothing has been applied.
    #[error("There are no applied migrations to undo")]
    NothingToUndo,

    /// Invalid migration description for a new file.
    #[error("Invalid migration name: {0}")]
    InvalidName(String),

    /// The next generated index would be wider than the latest one and sort before it.
    #[error("Next index after {0} would not sort last, widen the indices of existing migrations")]
    IndexExhausted(String),

    /// Failure while running a section of a specific migration.
    #[error("executing [{section}] of {filename} failed")]
    Step {
        filename: String,
        section: Section,
        #[source]
        source: Box<Error>,
    },

    /// YAML serialization error.
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn step(filename: &str, section: Section, source: Error) -> Self {
        Self::Step {
            filename: filename.to_string(),
            section,
            source: Box::new(source),
        }
    }

    /// Captured command output, if this error came from a command section.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Execution { output, .. } => Some(output),
            Self::Step { source, .. } => source.output(),
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(
        || "terminated by signal".to_string(),
        |c| format!("exit code {c}"),
    )
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, Error>;
