//! Migration directory scanning.
//!
//! Filenames are ordered byte-wise. That single ordering is used for
//! selection, status and pointer comparisons everywhere in the crate.

use crate::file::is_migration_file;
use crate::{Error, Migration, Result};
use std::fs;
use std::path::Path;

/// Lists migration filenames directly under `dir`, sorted.
///
/// The directory must exist. A missing one is a [`Error::Load`], so a
/// mistyped folder is never mistaken for one without pending migrations.
pub fn list_names(dir: &Path) -> Result<Vec<String>> {
    let load_error = |source| Error::Load {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(load_error)? {
        let entry = entry.map_err(load_error)?;
        if !entry.file_type().map_err(load_error)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_migration_file(name) {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Selects the names strictly after `lower` and up to and including `upper`.
///
/// An empty `upper` selects to the end. If `upper` is never met the
/// selection also runs to the end; callers that need the bound to exist
/// check membership themselves.
pub fn select_between<'a>(names: &'a [String], lower: &str, upper: &str) -> Vec<&'a str> {
    let mut selected = Vec::new();
    for name in names.iter().filter(|n| n.as_str() > lower) {
        selected.push(name.as_str());
        if !upper.is_empty() && name == upper {
            break;
        }
    }
    selected
}

/// Loads the migrations in `(lower, upper]` from `dir`, in order.
///
/// Every selected file is parsed fresh. The first parse failure aborts the load.
pub fn load_between(dir: &Path, lower: &str, upper: &str) -> Result<Vec<Migration>> {
    let names = list_names(dir)?;
    let selected = select_between(&names, lower, upper);

    tracing::debug!(
        dir = %dir.display(),
        lower,
        upper,
        total = names.len(),
        selected = selected.len(),
        "Scanned migrations"
    );

    selected
        .into_iter()
        .map(|name| Migration::load(dir.join(name)))
        .collect()
}

/// Loads every migration in `dir`.
pub fn load_all(dir: &Path) -> Result<Vec<Migration>> {
    load_between(dir, "", "")
}
