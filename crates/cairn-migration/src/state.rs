//! Persistence of the applied-migration pointer.
//!
//! The pointer is the filename of the last successfully applied migration.
//! An empty pointer means nothing has been applied.

use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Loads and saves the applied-migration pointer.
pub trait StateStore {
    /// Returns the stored pointer, or an empty string if none was ever saved.
    fn load_pointer(&self) -> Result<String>;

    /// Replaces the stored pointer.
    fn save_pointer(&self, filename: &str) -> Result<()>;
}

// ============================================================================
// Local file
// ============================================================================

/// Pointer kept in a local text file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load_pointer(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::StateStore(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save_pointer(&self, filename: &str) -> Result<()> {
        tracing::info!(path = %self.path.display(), pointer = filename, "Saving state");
        fs::write(&self.path, filename).map_err(|e| {
            Error::StateStore(format!("cannot write {}: {e}", self.path.display()))
        })
    }
}

// ============================================================================
// Cloud Storage object
// ============================================================================

/// Pointer kept as an object in a Cloud Storage bucket, transferred with `gsutil`.
#[derive(Debug, Clone)]
pub struct GcsStateStore {
    bucket: String,
    object: String,
    program: String,
}

impl GcsStateStore {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            program: "gsutil".to_string(),
        }
    }

    /// Uses another executable in place of `gsutil`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// `gs://bucket/object`
    pub fn url(&self) -> String {
        format!(
            "gs://{}/{}",
            self.bucket.trim_end_matches('/'),
            self.object.trim_start_matches('/')
        )
    }

    fn copy(&self, args: &[&str]) -> std::result::Result<(), String> {
        let output = Command::new(&self.program)
            .arg("-q")
            .args(args)
            .output()
            .map_err(|e| format!("cannot run {}: {e}", self.program))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() || !stderr.is_empty() {
            return Err(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            });
        }
        Ok(())
    }
}

fn is_missing_object(stderr: &str) -> bool {
    stderr.contains("No URLs matched") || stderr.contains("matched no objects")
}

impl StateStore for GcsStateStore {
    fn load_pointer(&self) -> Result<String> {
        let local = tempfile::NamedTempFile::new()?;
        let target = local.path().to_string_lossy().into_owned();
        let url = self.url();

        match self.copy(&["cp", &url, &target]) {
            Ok(()) => {}
            Err(stderr) if is_missing_object(&stderr) => {
                tracing::debug!(url, "No state object yet");
                return Ok(String::new());
            }
            Err(stderr) => {
                return Err(Error::StateStore(format!("load {url} failed: {stderr}")));
            }
        }

        let content = fs::read_to_string(local.path())?;
        Ok(content.trim().to_string())
    }

    fn save_pointer(&self, filename: &str) -> Result<()> {
        let local = tempfile::NamedTempFile::new()?;
        fs::write(local.path(), filename)?;
        let source = local.path().to_string_lossy().into_owned();
        let url = self.url();

        tracing::info!(url, pointer = filename, "Saving state");
        self.copy(&["-h", "Content-Type:text/plain", "cp", &source, &url])
            .map_err(|stderr| Error::StateStore(format!("save {url} failed: {stderr}")))
    }
}
