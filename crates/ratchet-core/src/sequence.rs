//! Migration file creation and version numbering
//!
//! New migrations are numbered on a configurable interval so that hotfix
//! migrations can be slotted in between already-deployed versions.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::migration::{is_valid_migration_name, load_migrations};

/// Controls how the next migration version is chosen and formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOptions {
    /// Versions are multiples of this interval
    pub interval: u64,
    /// Width of the zero-padded version in the file name
    pub zero_prefix_length: usize,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            interval: 10,
            zero_prefix_length: 6,
        }
    }
}

impl SequenceOptions {
    fn validate(&self) -> CoreResult<()> {
        if self.interval == 0 {
            return Err(CoreError::InvalidInterval { interval: 0 });
        }
        Ok(())
    }
}

/// Round `version` up to the next multiple of `interval`, half-away rounding
/// on the quotient so a hotfix version between multiples still lands on the
/// following slot.
pub fn next_version(version: u64, interval: u64) -> u64 {
    ((version as f64 / interval as f64).round() as u64) * interval + interval
}

/// Create the next empty migration file in `dir`.
///
/// The file name is the zero-padded next version, followed by `_name` when a
/// name is given, with a `.sql` suffix. The name must match `[A-Za-z0-9_-]+`.
pub fn create_migration_file(
    dir: &Path,
    name: &str,
    options: SequenceOptions,
) -> CoreResult<PathBuf> {
    options.validate()?;

    if !name.is_empty() && !is_valid_migration_name(name) {
        return Err(CoreError::InvalidMigrationName {
            name: name.to_string(),
        });
    }

    let migrations = load_migrations(dir, &[], false)?;
    let current = migrations.last().map_or(0, |m| m.version);
    let version = next_version(current, options.interval);

    let version_str = format!("{:0width$}", version, width = options.zero_prefix_length);
    let file_name = if name.is_empty() {
        format!("{}.sql", version_str)
    } else {
        format!("{}_{}.sql", version_str, name)
    };

    let path = dir.join(file_name);
    File::create(&path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(path)
}

#[cfg(test)]
#[path = "sequence_test.rs"]
mod tests;
