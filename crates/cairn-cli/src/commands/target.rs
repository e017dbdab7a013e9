//! Opening a migration target folder.

use anyhow::{Context, Result};
use cairn_config::{CairnConfig, Paths, StateLocation};
use cairn_migration::{
    Environment, Executor, FileStateStore, GcsStateStore, Sequencer, StateStore,
};
use std::path::{Path, PathBuf};

use super::GlobalOptions;
use crate::style::{self, colors::SemanticStyle};

/// Loaded configuration, migrations folder and state store of one target.
pub struct Target {
    pub config: CairnConfig,
    pub migrations_dir: PathBuf,
    store: Box<dyn StateStore>,
    verbose: bool,
}

impl Target {
    pub fn open(options: &GlobalOptions, target_dir: &Path) -> Result<Self> {
        let config = CairnConfig::load_from_dir(target_dir).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                target_dir.display()
            )
        })?;

        let migrations_dir = match &options.migrations {
            Some(dir) => std::path::absolute(dir)
                .with_context(|| format!("Invalid migrations folder {}", dir.display()))?,
            None => Paths::migrations_dir(&config.config_dir)?,
        };
        tracing::debug!(migrations = %migrations_dir.display(), "Reading migrations");

        let store: Box<dyn StateStore> = match config.state_location() {
            StateLocation::File(path) => Box::new(FileStateStore::new(path)),
            StateLocation::Bucket { bucket, object } => {
                Box::new(GcsStateStore::new(bucket, object))
            }
        };

        Ok(Self {
            verbose: options.verbose || config.verbose,
            config,
            migrations_dir,
            store,
        })
    }

    pub fn sequencer(&self) -> Sequencer<'_> {
        let env: Environment = self.config.shell_env().into_iter().collect();
        let executor = Executor::new(env).verbose(self.verbose);
        Sequencer::new(&self.migrations_dir, self.store.as_ref(), executor)
    }

    /// Runs `action` against this target. On failure the configuration
    /// and migrations folder are printed before the error propagates.
    pub fn run<T>(
        &self,
        action: &str,
        f: impl FnOnce(&Sequencer<'_>) -> cairn_migration::Result<T>,
    ) -> Result<T> {
        let sequencer = self.sequencer();
        f(&sequencer)
            .inspect_err(|_| self.print_diagnostics(action))
            .with_context(|| format!("{action} failed"))
    }

    fn print_diagnostics(&self, action: &str) {
        style::print_error(&format!("executing [{action}] failed"));
        eprintln!("{}", "checking cairn config ...".muted());
        eprintln!("{}", self.config.to_json());
        style::print_labeled_err("migrations", &self.migrations_dir.display().to_string());
    }
}
