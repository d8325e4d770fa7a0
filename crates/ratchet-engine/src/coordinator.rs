//! Migration coordinator
//!
//! Drives the full apply loop: take the lock, load and classify the
//! migration directory, reconcile the tracking tables, then walk every
//! not-yet-applied migration through mark-dirty, execute, mark-clean with a
//! history record per attempt. Also hosts the operator-facing history,
//! repair and setup-lock operations, which follow the same lock discipline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use ratchet_core::{load_migrations, Migration, StatementKind};
use ratchet_db::{Database, DbResult};

use crate::error::{EngineError, EngineResult};
use crate::executor;
use crate::lock;
use crate::options::MigrateOptions;
use crate::tracking::{self, HistoryRecord, UpgradeStatus};
use crate::upgrade;

/// Rows affected by one migration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationInfo {
    pub rows_affected: i64,
}

/// Per-file rows-affected report for an `up` run. Only DML migrations
/// appear; DDL has no row counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationsOutput(BTreeMap<String, MigrationInfo>);

impl MigrationsOutput {
    pub fn get(&self, file_name: &str) -> Option<&MigrationInfo> {
        self.0.get(file_name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MigrationInfo)> {
        self.0.iter().map(|(name, info)| (name.as_str(), info))
    }

    fn record(&mut self, file_name: &str, rows_affected: i64) {
        self.0
            .insert(file_name.to_string(), MigrationInfo { rows_affected });
    }
}

impl fmt::Display for MigrationsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "Migration Information:")?;
        for (file_name, info) in &self.0 {
            write!(
                f,
                "\n{} - rows affected: {}",
                file_name, info.rows_affected
            )?;
        }
        writeln!(f)
    }
}

/// Applies migration directories to the database behind a [`Database`].
pub struct Migrator {
    db: Arc<dyn Database>,
}

impl Migrator {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Apply every not-yet-applied migration in `dir`, oldest version first.
    pub async fn up(&self, dir: &Path, options: &MigrateOptions) -> EngineResult<MigrationsOutput> {
        options.validate()?;

        let lock =
            lock::acquire(self.db.as_ref(), &options.lock_table, &options.lock_identifier).await?;
        if !lock.acquired {
            return Err(lock_contention(&lock));
        }

        let result = self.up_locked(dir, options).await;
        lock.release(self.db.as_ref()).await;
        result
    }

    async fn up_locked(
        &self,
        dir: &Path,
        options: &MigrateOptions,
    ) -> EngineResult<MigrationsOutput> {
        let migrations =
            load_migrations(dir, &options.skip_versions, options.detect_partitioned_dml)?;

        tracking::ensure_migration_tables(self.db.as_ref(), &options.version_table).await?;

        let status =
            tracking::determine_upgrade_status(self.db.as_ref(), &options.version_table).await?;
        let output = match status {
            UpgradeStatus::UpgradeStarted => {
                upgrade::backfill(self.db.as_ref(), &migrations, &options.version_table).await?;
                let output = self.execute_apply(&migrations, options).await?;
                upgrade::mark_complete(self.db.as_ref()).await?;
                output
            }
            UpgradeStatus::UpgradeCompleted | UpgradeStatus::FirstRun => {
                self.execute_apply(&migrations, options).await?
            }
            other => {
                return Err(EngineError::UndeterminedState {
                    detail: format!("unexpected upgrade status {:?} after table setup", other),
                })
            }
        };

        if options.print_rows_affected {
            print!("{}", output);
        }
        Ok(output)
    }

    async fn execute_apply(
        &self,
        migrations: &[Migration],
        options: &MigrateOptions,
    ) -> EngineResult<MigrationsOutput> {
        let version_table = &options.version_table;

        if let Some((version, dirty)) = tracking::get_version(self.db.as_ref(), version_table).await?
        {
            if dirty {
                return Err(EngineError::DirtyMigration { version });
            }
        }

        let applied = tracking::applied_versions(self.db.as_ref(), version_table).await?;

        let mut output = MigrationsOutput::default();
        let mut count: i64 = 0;
        for migration in migrations {
            if options.limit == 0 {
                break;
            }
            if applied.contains(&(migration.version as i64)) {
                continue;
            }

            tracking::set_version(self.db.as_ref(), migration.version, true, version_table)
                .await?;

            match &migration.kind {
                StatementKind::Ddl => {
                    self.db
                        .apply_ddl(&migration.statements)
                        .await
                        .map_err(|e| execution_failure(migration, e))?;
                }
                StatementKind::Dml => {
                    let rows_affected = self
                        .apply_dml(&migration.statements)
                        .await
                        .map_err(|e| execution_failure(migration, e))?;
                    output.record(&migration.file_name, rows_affected);
                }
                StatementKind::PartitionedDml => {
                    let rows_affected = self
                        .apply_partitioned(migration, options, false)
                        .await?;
                    output.record(&migration.file_name, rows_affected);
                }
                StatementKind::ConvergentDml => {
                    let rows_affected = self.apply_partitioned(migration, options, true).await?;
                    output.record(&migration.file_name, rows_affected);
                }
                StatementKind::Other(kind) => {
                    return Err(EngineError::UnknownKind {
                        version: migration.version,
                        kind: kind.clone(),
                    });
                }
            }

            tracking::set_version(self.db.as_ref(), migration.version, false, version_table)
                .await?;

            if migration.name.is_empty() {
                println!("{}/up", migration.version);
            } else {
                println!("{}/up {}", migration.version, migration.name);
            }

            count += 1;
            if options.limit > 0 && count == options.limit {
                break;
            }
        }

        if count == 0 {
            println!("no change");
        }

        Ok(output)
    }

    /// Execute a DML migration's statements in order inside one read-write
    /// transaction, returning the summed affected-row count.
    async fn apply_dml(&self, statements: &[String]) -> DbResult<i64> {
        let rows_affected = Arc::new(AtomicI64::new(0));
        let statements = statements.to_vec();
        self.db
            .read_write_txn(Box::new({
                let rows_affected = Arc::clone(&rows_affected);
                move |txn| {
                    Box::pin(async move {
                        for statement in &statements {
                            let affected = txn.update(statement).await?;
                            rows_affected.fetch_add(affected, Ordering::SeqCst);
                        }
                        Ok(())
                    })
                }
            }))
            .await?;
        Ok(rows_affected.load(Ordering::SeqCst))
    }

    async fn apply_partitioned(
        &self,
        migration: &Migration,
        options: &MigrateOptions,
        fixed_point: bool,
    ) -> EngineResult<i64> {
        let concurrency = migration
            .directives
            .concurrency
            .unwrap_or(options.partitioned_concurrency);

        let (rows_affected, error) = executor::apply_partitioned(
            Arc::clone(&self.db),
            migration.statements.clone(),
            concurrency,
            fixed_point,
        )
        .await;

        if let Some(e) = error {
            log::warn!(
                "partitioned migration {} aborted after {} affected rows",
                migration.file_name,
                rows_affected
            );
            return Err(execution_failure(migration, e));
        }
        Ok(rows_affected)
    }

    /// Current `(version, dirty)` pair from the version table.
    pub async fn version(&self, options: &MigrateOptions) -> EngineResult<(i64, bool)> {
        options.validate()?;
        tracking::get_version(self.db.as_ref(), &options.version_table)
            .await?
            .ok_or(EngineError::NoMigration)
    }

    /// Read the migration history, ordered by creation time.
    pub async fn history(&self, options: &MigrateOptions) -> EngineResult<Vec<HistoryRecord>> {
        options.validate()?;

        let lock =
            lock::acquire(self.db.as_ref(), &options.lock_table, &options.lock_identifier).await?;
        if !lock.acquired {
            return Err(lock_contention(&lock));
        }

        let result = tracking::get_history(self.db.as_ref(), &options.version_table).await;
        lock.release(self.db.as_ref()).await;

        let mut history = result?;
        history.sort_by_key(|record| record.created);
        Ok(history)
    }

    /// Clean up after a failed migration: drop dirty history rows and point
    /// the version table back at the highest clean version.
    pub async fn repair(&self, options: &MigrateOptions) -> EngineResult<()> {
        options.validate()?;

        let lock =
            lock::acquire(self.db.as_ref(), &options.lock_table, &options.lock_identifier).await?;
        if !lock.acquired {
            return Err(lock_contention(&lock));
        }

        let result = self.repair_locked(options).await;
        lock.release(self.db.as_ref()).await;
        result
    }

    async fn repair_locked(&self, options: &MigrateOptions) -> EngineResult<()> {
        tracking::ensure_migration_tables(self.db.as_ref(), &options.version_table).await?;
        tracking::repair(self.db.as_ref(), &options.version_table).await
    }

    /// Create or reset the lock table, clearing any stale holder.
    pub async fn setup_lock(&self, options: &MigrateOptions) -> EngineResult<()> {
        options.validate()?;
        lock::setup_lock(self.db.as_ref(), &options.lock_table).await
    }
}

fn lock_contention(lock: &lock::MigrationLock) -> EngineError {
    EngineError::LockContention {
        holder: lock.holder.clone(),
        expiry: lock
            .expiry
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

fn execution_failure(migration: &Migration, source: ratchet_db::DbError) -> EngineError {
    EngineError::ExecutionFailure {
        file_name: migration.file_name.clone(),
        source,
    }
}
