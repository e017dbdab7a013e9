//! Infrastructure migration engine for cairn.
//!
//! Provides ordered, resumable application of shell-based migrations:
//! - YAML migration files with `do`, `undo` and `view` sections
//! - Boolean `if` conditions over configured variables
//! - One shell script per section, so lines share shell state
//! - A persisted pointer to the last applied migration

pub mod condition;
pub mod environment;
pub mod error;
pub mod executor;
pub mod file;
pub mod loader;
pub mod sequencer;
pub mod state;

pub use condition::{Condition, evaluate};
pub use environment::Environment;
pub use error::{Error, Result, Section};
pub use executor::{Executor, PlannedSection, SectionOutcome};
pub use file::{Migration, next_filename, pretty};
pub use loader::{list_names, load_all, load_between};
pub use sequencer::{
    MigrationStatus, PlanEntry, Sequencer, StatusEntry, StatusReport, StepReport, UndoReport,
    ViewEntry,
};
pub use state::{FileStateStore, GcsStateStore, StateStore};
