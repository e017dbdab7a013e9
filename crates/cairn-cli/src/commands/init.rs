//! Init command - creates a target folder with a starter configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cairn_config::{CairnConfig, Paths, STARTER_CONFIG};

use crate::style::{colors::SemanticStyle, print_hint, print_labeled, print_success};

pub fn run(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)
        .with_context(|| format!("Failed to create target folder {}", target_dir.display()))?;

    if let Some(existing) = Paths::config_file(target_dir) {
        println!(
            "Config file {} already present.",
            existing.display().to_string().code()
        );
        let config = CairnConfig::load_from_dir(target_dir)?;
        print_labeled("project", &config.project);
        match config.state_file {
            Some(path) => print_labeled("state file", &path.display().to_string()),
            None => {
                print_labeled("bucket", &config.bucket);
                print_labeled("state", &config.state);
            }
        }
        print_labeled("verbose", &config.verbose.to_string());
        return Ok(());
    }

    let location = Paths::default_config_file(target_dir);
    fs::write(&location, STARTER_CONFIG)
        .with_context(|| format!("Failed to write {}", location.display()))?;

    print_success(&format!("Wrote {}", location.display().to_string().code()));
    print_hint("Edit project, bucket and state, then create a migration with `cairn new <title>`");
    Ok(())
}
