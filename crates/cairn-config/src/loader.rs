//! Configuration loader with multi-source merging

use crate::{CairnConfig, ConfigError, Paths};
use anyhow::{Context, Result};
use config::FileFormat;
use std::path::{Path, PathBuf};

/// Loads the configuration of one target folder.
pub struct ConfigLoader {
    target_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new(target_dir: impl AsRef<Path>) -> Self {
        Self {
            target_dir: target_dir.as_ref().to_path_buf(),
            env_prefix: "CAIRN".to_string(),
        }
    }

    /// Set the environment variable prefix (default: "CAIRN")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<CairnConfig> {
        let target_dir = Paths::absolute(&self.target_dir)?;
        let config_file =
            Paths::config_file(&target_dir).ok_or_else(|| ConfigError::NotFound(target_dir.clone()))?;

        let mut builder = config::Config::builder();

        // 1. Built-in defaults
        let defaults = CairnConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Target config (cairn.yaml, cairn.yml or cairn.json)
        builder = builder.add_source(
            config::File::from(config_file.as_path())
                .required(true)
                .format(file_format(&config_file)),
        );

        // 3. Local overrides (cairn.local.yaml, gitignored)
        builder = builder.add_source(
            config::File::from(Paths::local_config_file(&target_dir))
                .required(false)
                .format(FileFormat::Yaml),
        );

        // 4. Environment variables (CAIRN_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let merged = builder
            .build()
            .with_context(|| format!("Failed to read configuration {}", config_file.display()))?;

        let mut cairn_config: CairnConfig = merged
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", config_file.display()))?;

        cairn_config.config_file = config_file;
        cairn_config.config_dir.clone_from(&target_dir);
        cairn_config.resolve_paths(&target_dir);
        cairn_config.validate()?;

        Ok(cairn_config)
    }
}

fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => FileFormat::Json,
        _ => FileFormat::Yaml,
    }
}
