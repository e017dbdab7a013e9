//! Configuration management for cairn
//!
//! Each migration target is a folder holding `cairn.yaml`. Configuration is
//! merged from multiple sources:
//! 1. Environment variables (CAIRN_* prefix, highest precedence)
//! 2. cairn.local.yaml (gitignored, local overrides)
//! 3. cairn.yaml, cairn.yml or cairn.json (git-tracked, target config)
//! 4. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{CONFIG_FILENAMES, LOCAL_CONFIG_FILENAME, Paths};

/// Variable holding the absolute path of the target folder.
pub const CONFIG_DIR_VAR: &str = "CAIRN_CONFIG_DIR";

/// Object name written into a fresh configuration.
pub const DEFAULT_STATE_OBJECT: &str = "cairn-last-migration";

/// Configuration of one migration target
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CairnConfig {
    /// Cloud project the infrastructure lives in, exposed as `$PROJECT`.
    pub project: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Bucket holding the state object.
    pub bucket: String,

    /// Object name of the applied-migration pointer.
    pub state: String,

    /// Keep the pointer in a local file instead of a bucket object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    /// Additional variables for every section.
    pub env: BTreeMap<String, String>,

    pub verbose: bool,

    /// Absolute path of the target folder. Set by the loader.
    #[serde(skip)]
    pub config_dir: PathBuf,

    /// File the configuration was read from. Set by the loader.
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Where the applied-migration pointer is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateLocation<'a> {
    File(&'a Path),
    Bucket { bucket: &'a str, object: &'a str },
}

impl CairnConfig {
    /// Load configuration of the given target folder
    pub fn load_from_dir(target_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new(target_dir).load()
    }

    /// Checks required keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "missing [project] value".to_string(),
            ));
        }
        if self.state_file.is_none() {
            if self.bucket.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "missing [bucket] value (or set [state_file])".to_string(),
                ));
            }
            if self.state.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "missing [state] value (or set [state_file])".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn state_location(&self) -> StateLocation<'_> {
        match &self.state_file {
            Some(path) => StateLocation::File(path),
            None => StateLocation::Bucket {
                bucket: &self.bucket,
                object: &self.state,
            },
        }
    }

    /// Variables exposed to command sections and conditions.
    pub fn shell_env(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("PROJECT".to_string(), self.project.clone());
        if let Some(region) = &self.region {
            vars.insert("REGION".to_string(), region.clone());
        }
        if let Some(zone) = &self.zone {
            vars.insert("ZONE".to_string(), zone.clone());
        }
        for (key, value) in &self.env {
            vars.insert(key.to_uppercase(), value.clone());
        }
        if !self.config_dir.as_os_str().is_empty() {
            vars.insert(
                CONFIG_DIR_VAR.to_string(),
                self.config_dir.display().to_string(),
            );
        }
        vars
    }

    /// Pretty JSON, for diagnostics.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unprintable: {e}>"))
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        if let Some(state_file) = &self.state_file {
            if state_file.is_relative() {
                self.state_file = Some(base_dir.as_ref().join(state_file));
            }
        }
    }
}

/// Commented starter configuration written by `init`.
pub const STARTER_CONFIG: &str = r#"# cairn configuration file
#
# Migrations are read from the parent folder of this target folder.

# [project] is the cloud project ID where the infrastructure is created.
# Its value is available as $PROJECT in your migrations.
#
# Required.
project: my-project

# [region] is available as $REGION in your migrations.
#
# Not required by cairn but some gcloud and gsutil commands do require it.
# region: europe-west1

# [zone] is available as $ZONE in your migrations.
#
# Not required by cairn but some gcloud and gsutil commands do require it.
# zone: europe-west1-b

# [bucket] is the Cloud Storage bucket that stores the last applied migration.
# A bucket can hold objects for multiple applications. Make sure [state] is
# different for each one.
#
# Required unless [state_file] is set.
bucket: my-bucket

# [state] is the name of the object that holds the last applied migration.
#
# Required unless [state_file] is set.
state: cairn-last-migration

# [state_file] keeps the last applied migration in a local file instead.
# Relative paths are resolved against this folder.
#
# state_file: .cairn-state

# [env] are additional variables available to each section of a migration.
# By convention, use capitalized words for keys.
# Here "myapp-cluster" is available as $K8S_CLUSTER in your migrations.
#
# env:
#   K8S_CLUSTER: myapp-cluster
"#;
