//! Migration file loading
//!
//! Enumerates a directory of versioned SQL files, parses each into a
//! [`Migration`], and returns the set sorted by version with duplicates
//! rejected.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::directive::{parse_directives, MigrationDirectives};
use crate::error::{CoreError, CoreResult};
use crate::statement::{inspect_kind, StatementKind};
use crate::tokenizer::split_statements;

// Accepted file names:
//   001.sql
//   001_name.sql
//   001_name.up.sql
//   001_name.generated.sql
// Anything else, including *.down.sql, is ignored.
static MIGRATION_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)(?:_([A-Za-z0-9_\-]+))?(?:\.up|\.generated)?\.sql$")
        .expect("static regex")
});

static MIGRATION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("static regex"));

/// A parsed migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Strict ordering key, unique within a directory
    pub version: u64,
    /// Optional human label from the file name
    pub name: String,
    /// Original file name, used for reporting
    pub file_name: String,
    /// Comment-free SQL statements in file order
    pub statements: Vec<String>,
    /// Effective execution mode: directive override, else classifier result
    pub kind: StatementKind,
    /// Configuration parsed from the file preamble
    pub directives: MigrationDirectives,
}

/// Check a migration name against the allowed character class.
pub fn is_valid_migration_name(name: &str) -> bool {
    MIGRATION_NAME_RE.is_match(name)
}

/// Load every migration file in `dir`, skipping the versions in `skip`.
///
/// Files whose names do not match the migration pattern are ignored, so a
/// README or fixtures directory can live alongside the SQL. The result is
/// sorted by version; two files sharing a version fail with
/// [`CoreError::DuplicateVersion`].
pub fn load_migrations(
    dir: &Path,
    skip: &[u64],
    detect_partitioned: bool,
) -> CoreResult<Vec<Migration>> {
    let to_skip: HashSet<u64> = skip.iter().copied().collect();

    let entries = fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(caps) = MIGRATION_FILE_RE.captures(&file_name) else {
            continue;
        };

        let Ok(version) = caps[1].parse::<u64>() else {
            log::debug!("skipping {}: version does not fit in u64", file_name);
            continue;
        };
        if to_skip.contains(&version) {
            continue;
        }

        let path = entry.path();
        let contents = fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let statements = split_statements(&contents)?;
        let directives = parse_directives(&contents)?;
        // A StatementKind directive wins unconditionally; classification only
        // runs (and can only reject a mixed file) without one.
        let kind = match directives.statement_kind.clone() {
            Some(kind) => kind,
            None => inspect_kind(&file_name, &statements, detect_partitioned)?,
        };

        migrations.push(Migration {
            version,
            name: caps.get(2).map_or(String::new(), |m| m.as_str().to_string()),
            file_name,
            statements,
            kind,
            directives,
        });
    }

    migrations.sort_by_key(|m| m.version);

    let mut seen: HashMap<u64, &str> = HashMap::new();
    for m in &migrations {
        if let Some(other) = seen.get(&m.version) {
            return Err(CoreError::DuplicateVersion {
                version: m.version,
                file_name: m.file_name.clone(),
                other_file_name: other.to_string(),
            });
        }
        seen.insert(m.version, &m.file_name);
    }

    Ok(migrations)
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
