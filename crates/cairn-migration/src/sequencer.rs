//! Drives migrations forward and backward against a [`StateStore`].
//!
//! Every operation reads the pointer once at the start. `up` writes it after
//! each migration whose `do` section succeeds, so an interrupted run resumes
//! at the first unconfirmed migration.

use crate::executor::{Executor, PlannedSection, SectionOutcome};
use crate::file::{Migration, pretty};
use crate::{Error, Result, Section, StateStore, condition, loader};
use std::path::{Path, PathBuf};

/// A migration section that ran (or was skipped) during an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub filename: String,
    pub outcome: SectionOutcome,
}

/// Result of `down`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    /// Migration whose `undo` section ran.
    pub filename: String,
    pub outcome: SectionOutcome,
    /// Pointer after the undo, empty when nothing remains applied.
    pub pointer: String,
}

/// Classification of one migration relative to the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// At or before the pointer, condition true.
    Applied,
    /// After the pointer, condition true.
    Pending,
    /// At or before the pointer, condition false.
    Skipped,
    /// After the pointer, condition false.
    SkipPending,
    /// The condition could not be evaluated.
    Error(String),
}

impl MigrationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::SkipPending => "skip-pending",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub filename: String,
    pub status: MigrationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub pointer: String,
    pub entries: Vec<StatusEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub filename: String,
    pub section: PlannedSection,
}

/// What `view` did for one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEntry {
    Viewed(StepReport),
    /// First pending migration. Viewing halts here.
    Pending(String),
}

/// Runs migration operations for one migrations directory.
pub struct Sequencer<'a> {
    migrations_dir: PathBuf,
    store: &'a dyn StateStore,
    executor: Executor,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        migrations_dir: impl Into<PathBuf>,
        store: &'a dyn StateStore,
        executor: Executor,
    ) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            store,
            executor,
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Reads the pointer without checking that it names an existing file.
    pub fn stored_pointer(&self) -> Result<String> {
        self.store.load_pointer()
    }

    /// Reads the pointer, which must name a listed migration.
    ///
    /// A file that exists but is not a migration (wrong extension, a folder)
    /// is rejected too, since selection would never meet it as a bound.
    pub fn pointer(&self) -> Result<String> {
        let pointer = self.store.load_pointer()?;
        if !pointer.is_empty() {
            self.ensure_listed(&pointer)?;
        }
        Ok(pointer)
    }

    /// Applies pending migrations in order, through `stop` when it is non-empty.
    pub fn up(&self, stop: &str) -> Result<Vec<StepReport>> {
        let pending = self.pending(stop)?;
        let mut applied = Vec::with_capacity(pending.len());

        for migration in pending {
            tracing::info!(migration = %pretty(&migration.filename), "Applying do");

            let outcome = self
                .executor
                .run(&migration.condition, &migration.do_section)
                .map_err(|e| Error::step(&migration.filename, Section::Do, e))?;
            log_outcome(&migration.filename, &outcome);

            self.store.save_pointer(&migration.filename)?;
            applied.push(StepReport {
                filename: migration.filename,
                outcome,
            });
        }

        if !stop.is_empty() && applied.last().is_some_and(|s| s.filename == stop) {
            tracing::info!(stop, "Stopped after requested migration");
        }
        Ok(applied)
    }

    /// Reverts the last applied migration.
    pub fn down(&self) -> Result<UndoReport> {
        let last = self.pointer()?;
        if last.is_empty() {
            return Err(Error::NothingToUndo);
        }

        let mut applied = loader::load_between(&self.migrations_dir, "", &last)?;
        let Some(migration) = applied.pop() else {
            return Err(Error::NothingToUndo);
        };
        if migration.filename != last {
            return Err(Error::NotFound(self.migrations_dir.join(&last)));
        }
        let previous = applied
            .last()
            .map(|m| m.filename.clone())
            .unwrap_or_default();

        tracing::info!(migration = %pretty(&migration.filename), "Applying undo");
        let outcome = self
            .executor
            .run(&migration.condition, &migration.undo_section)
            .map_err(|e| Error::step(&migration.filename, Section::Undo, e))?;
        log_outcome(&migration.filename, &outcome);

        self.store.save_pointer(&previous)?;
        Ok(UndoReport {
            filename: migration.filename,
            outcome,
            pointer: previous,
        })
    }

    /// Classifies every migration. Reads the pointer and never writes it.
    pub fn status(&self) -> Result<StatusReport> {
        let pointer = self.pointer()?;
        let entries = loader::load_all(&self.migrations_dir)?
            .into_iter()
            .map(|m| {
                let pending = m.filename.as_str() > pointer.as_str();
                let status = match condition::evaluate(&m.condition, self.executor.env()) {
                    Ok(true) if pending => MigrationStatus::Pending,
                    Ok(true) => MigrationStatus::Applied,
                    Ok(false) if pending => MigrationStatus::SkipPending,
                    Ok(false) => MigrationStatus::Skipped,
                    Err(e) => MigrationStatus::Error(e.to_string()),
                };
                StatusEntry {
                    filename: m.filename,
                    status,
                }
            })
            .collect();

        Ok(StatusReport { pointer, entries })
    }

    /// Renders the `do` sections `up` would run, without running or saving anything.
    pub fn plan(&self, stop: &str) -> Result<Vec<PlanEntry>> {
        self.pending(stop)?
            .into_iter()
            .map(|m| {
                let section = self
                    .executor
                    .plan(&m.condition, &m.do_section)
                    .map_err(|e| Error::step(&m.filename, Section::Do, e))?;
                if let PlannedSection::Lines(lines) = &section {
                    for line in lines {
                        tracing::debug!(migration = %m.filename, "{line}");
                    }
                }
                Ok(PlanEntry {
                    filename: m.filename,
                    section,
                })
            })
            .collect()
    }

    /// Runs `view` sections of applied migrations, halting at the first pending one.
    ///
    /// With `filename`, only that migration is considered.
    pub fn view(&self, filename: Option<&str>) -> Result<Vec<ViewEntry>> {
        let pointer = self.pointer()?;
        let migrations = match filename {
            Some(name) => vec![Migration::load(self.resolve(name))?],
            None => loader::load_all(&self.migrations_dir)?,
        };

        let mut entries = Vec::new();
        for migration in migrations {
            if migration.filename.as_str() > pointer.as_str() {
                tracing::info!(migration = %pretty(&migration.filename), "Migration is pending");
                entries.push(ViewEntry::Pending(migration.filename));
                break;
            }
            if migration.view_section.is_empty() {
                tracing::info!(
                    migration = %pretty(&migration.filename),
                    "No commands describe this migration"
                );
            }

            let outcome = self
                .executor
                .run(&migration.condition, &migration.view_section)
                .map_err(|e| Error::step(&migration.filename, Section::View, e))?;
            log_outcome(&migration.filename, &outcome);

            entries.push(ViewEntry::Viewed(StepReport {
                filename: migration.filename,
                outcome,
            }));
        }
        Ok(entries)
    }

    /// Overwrites the pointer with an existing migration filename.
    pub fn force_state(&self, filename: &str) -> Result<String> {
        let path = self.resolve(filename);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::NotFound(path.clone()))?;
        self.ensure_listed(name)?;

        let migration = Migration::load(&path)?;
        tracing::info!(pointer = %migration.filename, "Forcing state");
        self.store.save_pointer(&migration.filename)?;
        Ok(migration.filename)
    }

    /// Runs one section of one migration. The pointer is left untouched.
    pub fn force_section(&self, filename: &str, section: Section) -> Result<StepReport> {
        let migration = Migration::load(self.resolve(filename))?;
        let commands = match section {
            Section::Do => &migration.do_section,
            Section::Undo => &migration.undo_section,
            Section::View => &migration.view_section,
        };

        tracing::info!(migration = %pretty(&migration.filename), %section, "Forcing section");
        let outcome = self
            .executor
            .run(&migration.condition, commands)
            .map_err(|e| Error::step(&migration.filename, section, e))?;
        log_outcome(&migration.filename, &outcome);

        Ok(StepReport {
            filename: migration.filename,
            outcome,
        })
    }

    /// Pending migrations through `stop`, validated the way `up` requires.
    fn pending(&self, stop: &str) -> Result<Vec<Migration>> {
        let last = self.pointer()?;
        let pending = loader::load_between(&self.migrations_dir, &last, stop)?;

        if !stop.is_empty() && !pending.iter().any(|m| m.filename == stop) {
            if stop > last.as_str() {
                return Err(Error::BoundNotFound(stop.to_string()));
            }
            tracing::warn!(
                stop,
                pointer = %last,
                "Stop migration is already applied, ignoring it"
            );
        }
        Ok(pending)
    }

    fn ensure_listed(&self, filename: &str) -> Result<()> {
        let names = loader::list_names(&self.migrations_dir)?;
        if names.iter().any(|n| n == filename) {
            Ok(())
        } else {
            Err(Error::NotFound(self.migrations_dir.join(filename)))
        }
    }

    /// Only the final path component of a user-supplied name is used.
    fn resolve(&self, filename: &str) -> PathBuf {
        let name = Path::new(filename)
            .file_name()
            .map_or_else(|| filename.into(), PathBuf::from);
        self.migrations_dir.join(name)
    }
}

fn log_outcome(filename: &str, outcome: &SectionOutcome) {
    match outcome {
        SectionOutcome::Skipped => tracing::info!(migration = filename, "Condition false, skipped"),
        SectionOutcome::Empty => tracing::debug!(migration = filename, "No commands"),
        SectionOutcome::Ran { output } if !output.is_empty() => {
            tracing::info!(migration = filename, "{}", output.trim_end());
        }
        SectionOutcome::Ran { .. } => {}
    }
}
