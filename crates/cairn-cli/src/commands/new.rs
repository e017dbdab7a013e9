//! New command - creates the next migration file.

use anyhow::{Context, Result};
use cairn_migration::Migration;

use super::GlobalOptions;
use crate::style::{colors::SemanticStyle, print_success};

/// Section overrides given on the command line. Commands are newline separated.
#[derive(Debug, Default)]
pub struct Sections {
    pub do_section: Option<String>,
    pub undo_section: Option<String>,
    pub view_section: Option<String>,
    pub condition: Option<String>,
}

fn split_lines(value: &str) -> Vec<String> {
    value.split('\n').map(ToString::to_string).collect()
}

pub fn run(options: &GlobalOptions, title: &str, sections: &Sections) -> Result<()> {
    let migrations_dir = match &options.migrations {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current folder")?,
    };

    let mut migration = Migration::draft(title);
    if let Some(value) = sections.do_section.as_deref().filter(|v| !v.is_empty()) {
        migration.do_section = split_lines(value);
    }
    if let Some(value) = sections.undo_section.as_deref().filter(|v| !v.is_empty()) {
        migration.undo_section = split_lines(value);
    }
    if let Some(value) = sections.view_section.as_deref().filter(|v| !v.is_empty()) {
        migration.view_section = split_lines(value);
    }
    if let Some(condition) = &sections.condition {
        migration.condition.clone_from(condition);
    }

    let (path, migration) = migration
        .create(&migrations_dir)
        .with_context(|| format!("Failed to create migration '{title}'"))?;
    tracing::debug!(path = %path.display(), "Created migration");

    print_success(&format!("Created {}", migration.filename.code()));
    Ok(())
}
