//! Migration workflow commands.

use anyhow::Result;
use cairn_migration::{MigrationStatus, PlannedSection, ViewEntry, pretty};
use std::path::Path;

use super::GlobalOptions;
use super::target::Target;
use crate::style::{self, colors::SemanticStyle, print_hint, print_success, print_warn};

/// Apply pending migrations, through `stop` when given.
pub fn up(options: &GlobalOptions, target_dir: &Path, stop: &str) -> Result<()> {
    let target = Target::open(options, target_dir)?;
    let applied = target.run("do", |s| s.up(stop))?;

    if applied.is_empty() {
        print_success("No pending migrations");
        return Ok(());
    }

    for step in &applied {
        let note = if step.outcome.is_skipped() {
            " (condition false, skipped)".muted()
        } else {
            String::new()
        };
        print_success(&format!("{}{note}", pretty(&step.filename)));
    }
    if !stop.is_empty() && applied.last().is_some_and(|s| s.filename == stop) {
        println!("{}", "... stopped ...".muted());
    }
    print_success(&format!("Applied {} migration(s)", applied.len()));
    Ok(())
}

/// Undo the last applied migration.
pub fn down(options: &GlobalOptions, target_dir: &Path) -> Result<()> {
    let target = Target::open(options, target_dir)?;
    let report = target.run("undo", |s| s.down())?;

    print_success(&format!("Undone {}", pretty(&report.filename)));
    if report.pointer.is_empty() {
        print_hint("No migrations remain applied");
    } else {
        style::print_labeled("last applied", &report.pointer);
    }
    Ok(())
}

/// Show how every migration relates to the last applied one.
pub fn status(options: &GlobalOptions, target_dir: &Path) -> Result<()> {
    let target = Target::open(options, target_dir)?;
    let report = target.run("status", |s| s.status())?;

    if report.entries.is_empty() {
        println!("No migrations found in {}", target.migrations_dir.display());
        print_hint("Create your first migration with `cairn new <title>`");
        return Ok(());
    }

    println!("{}", style::status_table(&report));

    let pending = report
        .entries
        .iter()
        .filter(|e| e.status == MigrationStatus::Pending)
        .count();
    let applied = report
        .entries
        .iter()
        .filter(|e| e.status == MigrationStatus::Applied)
        .count();
    println!(
        "Applied: {} | Pending: {}",
        applied.to_string().success(),
        if pending == 0 {
            pending.to_string().success()
        } else {
            pending.to_string().warning()
        }
    );

    for entry in &report.entries {
        if let MigrationStatus::Error(reason) = &entry.status {
            print_warn(&format!("{}: {reason}", entry.filename));
        }
    }
    Ok(())
}

/// Show the commands `up` would run.
pub fn plan(options: &GlobalOptions, target_dir: &Path, stop: &str) -> Result<()> {
    let target = Target::open(options, target_dir)?;
    let entries = target.run("plan", |s| s.plan(stop))?;

    if entries.is_empty() {
        print_success("No pending migrations");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{} {}",
            pretty(&entry.filename).header(),
            format!("({})", entry.filename).muted()
        );
        match &entry.section {
            PlannedSection::Skipped => println!("  {}", "condition false, skipped".muted()),
            PlannedSection::Lines(lines) if lines.is_empty() => {
                println!("  {}", "no commands".muted());
            }
            PlannedSection::Lines(lines) => {
                for line in lines {
                    println!("  {}", line.code());
                }
            }
        }
    }
    Ok(())
}

/// Run view sections of applied migrations. Their output is logged as it runs.
pub fn view(options: &GlobalOptions, target_dir: &Path, file: Option<&str>) -> Result<()> {
    let target = Target::open(options, target_dir)?;
    let entries = target.run("view", |s| s.view(file))?;

    for entry in &entries {
        match entry {
            ViewEntry::Viewed(step) if step.outcome.is_skipped() => {
                println!("{} {}", pretty(&step.filename), "(condition false)".muted());
            }
            ViewEntry::Viewed(step) => print_success(&pretty(&step.filename)),
            ViewEntry::Pending(filename) => {
                print_warn(&format!("{} is pending", pretty(filename)));
            }
        }
    }
    Ok(())
}
