//! Force commands - change state or run one section out of order.

use anyhow::Result;
use cairn_migration::{Section, pretty};
use std::path::Path;

use super::GlobalOptions;
use super::target::Target;
use crate::style::{confirm, print_success};

/// Overwrite the last applied migration with `file`.
pub fn state(options: &GlobalOptions, target_dir: &Path, file: &str) -> Result<()> {
    let target = Target::open(options, target_dir)?;
    let current = target.sequencer().stored_pointer()?;

    if !options.quiet
        && !confirm(&format!(
            "Are you sure to overwrite the last applied migration [{current} -> {file}]?"
        ))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let saved = target.run("force state", |s| s.force_state(file))?;
    print_success(&format!("Last applied migration is now {saved}"));
    Ok(())
}

/// Run the `do` or `undo` section of `file`. State is not changed.
pub fn section(
    options: &GlobalOptions,
    target_dir: &Path,
    file: &str,
    section: Section,
) -> Result<()> {
    let target = Target::open(options, target_dir)?;

    if !options.quiet
        && !confirm(&format!(
            "Are you sure to run the [{section}] section of migration [{file}]?"
        ))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let step = target.run(&section.to_string(), |s| s.force_section(file, section))?;
    print_success(&format!("Ran [{section}] of {}", pretty(&step.filename)));
    Ok(())
}
