//! Operation options
//!
//! Every coordinator operation takes a plain options record; there is no
//! in-process global state. Construct with struct-update syntax over
//! [`MigrateOptions::default`] and rely on [`MigrateOptions::validate`]
//! running at each operation boundary.

use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Default name of the single-row version table.
pub const DEFAULT_VERSION_TABLE: &str = "SchemaMigrations";
/// Default name of the lock table.
pub const DEFAULT_LOCK_TABLE: &str = "SchemaMigrationsLock";

/// Options shared by the migrate operations.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Name of the table that stores the current version
    pub version_table: String,
    /// Name of the table that stores the migration lock
    pub lock_table: String,
    /// Identifier recorded while this process holds the lock
    pub lock_identifier: String,
    /// Versions to leave out when loading the migration directory
    pub skip_versions: Vec<u64>,
    /// Maximum number of migrations to apply; negative means unlimited
    pub limit: i64,
    /// Worker count for partitioned DML, unless a migration overrides it
    pub partitioned_concurrency: usize,
    /// Classify partition-safe UPDATE/DELETE files as partitioned DML
    pub detect_partitioned_dml: bool,
    /// Print the per-file rows-affected report after `up`
    pub print_rows_affected: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            lock_table: DEFAULT_LOCK_TABLE.to_string(),
            lock_identifier: Uuid::new_v4().to_string(),
            skip_versions: Vec::new(),
            limit: -1,
            partitioned_concurrency: 1,
            detect_partitioned_dml: false,
            print_rows_affected: false,
        }
    }
}

impl MigrateOptions {
    pub fn validate(&self) -> EngineResult<()> {
        if self.version_table.is_empty() {
            return Err(invalid("version table name cannot be empty"));
        }
        if self.lock_table.is_empty() {
            return Err(invalid("lock table name cannot be empty"));
        }
        if self.lock_identifier.is_empty() {
            return Err(invalid("lock identifier cannot be empty"));
        }
        if self.partitioned_concurrency == 0 {
            return Err(invalid("partitioned DML concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Name of the history table paired with the configured version table.
    pub fn history_table(&self) -> String {
        crate::tracking::history_table_name(&self.version_table)
    }
}

fn invalid(message: &str) -> EngineError {
    EngineError::InvalidOptions {
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "options_test.rs"]
mod tests;
