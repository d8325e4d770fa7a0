//! Tracking tables
//!
//! The version, history, lock and upgrade-indicator tables are the engine's
//! only persistent state. This module owns their DDL, detects which of them
//! exist, and performs the version/history bookkeeping around each
//! migration. The version write is atomic: one transaction replaces the
//! single version row and upserts the matching history row.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ratchet_db::{Database, KeySet, Mutation, Row, Transaction, Value};

use crate::error::{EngineError, EngineResult};
use crate::lock;

/// The marker table whose existence means a version-only predecessor was
/// detected and the history backfill has not completed yet.
pub const UPGRADE_INDICATOR_TABLE: &str = "ratchet_upgrade_indicator";

const HISTORY_SUFFIX: &str = "History";

pub(crate) const COL_VERSION: &str = "Version";
pub(crate) const COL_DIRTY: &str = "Dirty";
pub(crate) const COL_CREATED: &str = "Created";
pub(crate) const COL_MODIFIED: &str = "Modified";

/// Name of the history table paired with `version_table`.
pub fn history_table_name(version_table: &str) -> String {
    format!("{version_table}{HISTORY_SUFFIX}")
}

/// Where the database sits on the version-only to version-plus-history
/// upgrade path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeStatus {
    /// No tracking tables exist yet
    FirstRun,
    /// Only the version table exists; upgrade not started
    ExistingNoUpgrade,
    /// Indicator present; history backfill pending or in progress
    UpgradeStarted,
    /// Version and history tables both exist, no indicator
    UpgradeCompleted,
}

/// One row of the migration history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub version: i64,
    pub dirty: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl HistoryRecord {
    fn from_row(row: &Row) -> EngineResult<Self> {
        Ok(Self {
            version: row.get_i64(COL_VERSION)?,
            dirty: row.get_bool(COL_DIRTY)?,
            created: row.get_timestamp(COL_CREATED)?,
            modified: row.get_timestamp(COL_MODIFIED)?,
        })
    }
}

/// Inspect the catalog and classify the tracking-table state.
pub async fn determine_upgrade_status(
    db: &dyn Database,
    version_table: &str,
) -> EngineResult<UpgradeStatus> {
    let version = db.table_exists(version_table).await?;
    let history = db.table_exists(&history_table_name(version_table)).await?;
    let indicator = db.table_exists(UPGRADE_INDICATOR_TABLE).await?;

    match (version, history, indicator) {
        (false, false, false) => Ok(UpgradeStatus::FirstRun),
        (true, false, false) => Ok(UpgradeStatus::ExistingNoUpgrade),
        (true, true, false) => Ok(UpgradeStatus::UpgradeCompleted),
        (true, _, true) => Ok(UpgradeStatus::UpgradeStarted),
        _ => Err(EngineError::UndeterminedState {
            detail: format!(
                "version_table={version} history_table={history} upgrade_indicator={indicator}"
            ),
        }),
    }
}

/// Create whichever tracking tables the current state calls for.
///
/// On a first run this creates the version, history and lock tables. When
/// only the version table exists, it marks the upgrade by creating the
/// indicator alongside the history and lock tables; the reconciler finishes
/// the job on the next apply.
pub async fn ensure_migration_tables(db: &dyn Database, version_table: &str) -> EngineResult<()> {
    match determine_upgrade_status(db, version_table).await? {
        UpgradeStatus::FirstRun => {
            create_version_table(db, version_table).await?;
            create_history_table(db, &history_table_name(version_table)).await?;
            lock::create_lock_table(db, &lock::lock_table_name(version_table)).await?;
        }
        UpgradeStatus::ExistingNoUpgrade => {
            create_upgrade_indicator(db).await?;
            create_history_table(db, &history_table_name(version_table)).await?;
            lock::create_lock_table(db, &lock::lock_table_name(version_table)).await?;
        }
        UpgradeStatus::UpgradeStarted | UpgradeStatus::UpgradeCompleted => {}
    }
    Ok(())
}

async fn create_version_table(db: &dyn Database, table: &str) -> EngineResult<()> {
    if db.table_exists(table).await? {
        return Ok(());
    }
    let ddl = format!(
        "CREATE TABLE {table} (\n    Version INT64 NOT NULL,\n    Dirty BOOL NOT NULL\n) PRIMARY KEY(Version)"
    );
    db.apply_ddl(&[ddl]).await?;
    Ok(())
}

async fn create_history_table(db: &dyn Database, table: &str) -> EngineResult<()> {
    if db.table_exists(table).await? {
        return Ok(());
    }
    let ddl = format!(
        "CREATE TABLE {table} (\n    Version INT64 NOT NULL,\n    Dirty BOOL NOT NULL,\n    Created TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),\n    Modified TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true)\n) PRIMARY KEY(Version)"
    );
    db.apply_ddl(&[ddl]).await?;
    Ok(())
}

async fn create_upgrade_indicator(db: &dyn Database) -> EngineResult<()> {
    if db.table_exists(UPGRADE_INDICATOR_TABLE).await? {
        return Ok(());
    }
    let ddl =
        format!("CREATE TABLE {UPGRADE_INDICATOR_TABLE} (Dummy INT64 NOT NULL) PRIMARY KEY(Dummy)");
    db.apply_ddl(&[ddl]).await?;
    Ok(())
}

/// Read the current `(version, dirty)` pair, or `None` when no migration has
/// ever been recorded.
pub async fn get_version(
    db: &dyn Database,
    version_table: &str,
) -> EngineResult<Option<(i64, bool)>> {
    let rows = db.read_all(version_table).await?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    Ok(Some((row.get_i64(COL_VERSION)?, row.get_bool(COL_DIRTY)?)))
}

/// Set the version pointer and record the attempt in history, atomically.
///
/// The version table is rewritten wholesale (delete all rows, insert one),
/// which keeps its at-most-one-row invariant even if a previous writer left
/// debris behind.
pub async fn set_version(
    db: &dyn Database,
    version: u64,
    dirty: bool,
    version_table: &str,
) -> EngineResult<()> {
    let history_table = history_table_name(version_table);
    let version_table = version_table.to_string();
    db.read_write_txn(Box::new(move |txn| {
        Box::pin(async move {
            txn.buffer_write(vec![
                Mutation::delete_all(&version_table),
                Mutation::insert(
                    &version_table,
                    Row::new()
                        .with(COL_VERSION, Value::Int64(version as i64))
                        .with(COL_DIRTY, Value::Bool(dirty)),
                ),
            ]);
            upsert_version_history(txn, version as i64, dirty, &history_table).await
        })
    }))
    .await?;
    Ok(())
}

/// Insert a new history row with commit-timestamped `Created`/`Modified`, or
/// flip the dirty flag and touch `Modified` on an existing one.
pub(crate) async fn upsert_version_history(
    txn: &mut dyn Transaction,
    version: i64,
    dirty: bool,
    history_table: &str,
) -> ratchet_db::DbResult<()> {
    let existing = txn
        .read_row(history_table, &vec![Value::Int64(version)])
        .await?;

    let mutation = match existing {
        None => Mutation::insert(
            history_table,
            Row::new()
                .with(COL_VERSION, Value::Int64(version))
                .with(COL_DIRTY, Value::Bool(dirty))
                .with(COL_CREATED, Value::CommitTimestamp)
                .with(COL_MODIFIED, Value::CommitTimestamp),
        ),
        Some(_) => Mutation::update(
            history_table,
            Row::new()
                .with(COL_VERSION, Value::Int64(version))
                .with(COL_DIRTY, Value::Bool(dirty))
                .with(COL_MODIFIED, Value::CommitTimestamp),
        ),
    };
    txn.buffer_write(vec![mutation]);
    Ok(())
}

/// Read the full migration history, in version order.
pub async fn get_history(
    db: &dyn Database,
    version_table: &str,
) -> EngineResult<Vec<HistoryRecord>> {
    let history_table = history_table_name(version_table);
    if !db.table_exists(&history_table).await? {
        return Err(EngineError::HistoryNotFound);
    }
    let rows = db.read_all(&history_table).await?;
    rows.iter().map(HistoryRecord::from_row).collect()
}

/// Remove dirty history rows and point the version table back at the highest
/// clean version.
///
/// Runs in a single transaction and is idempotent: on a clean database there
/// are no dirty rows to delete and the version row is rewritten to the value
/// it already holds.
pub async fn repair(db: &dyn Database, version_table: &str) -> EngineResult<()> {
    let history_table = history_table_name(version_table);
    let version_table = version_table.to_string();
    let found_anchor = Arc::new(AtomicBool::new(false));

    db.read_write_txn(Box::new({
        let found_anchor = Arc::clone(&found_anchor);
        move |txn| {
            Box::pin(async move {
                let rows = txn.read_all(&history_table).await?;
                let mut dirty_keys = Vec::new();
                let mut anchor: Option<i64> = None;
                for row in &rows {
                    let version = row.get_i64(COL_VERSION)?;
                    if row.get_bool(COL_DIRTY)? {
                        dirty_keys.push(vec![Value::Int64(version)]);
                    } else {
                        anchor = Some(anchor.map_or(version, |a: i64| a.max(version)));
                    }
                }

                let Some(anchor) = anchor else {
                    // Nothing to restore to; the caller reports the failure.
                    return Ok(());
                };
                found_anchor.store(true, Ordering::SeqCst);

                txn.buffer_write(vec![
                    Mutation::delete(&history_table, KeySet::Keys(dirty_keys)),
                    Mutation::delete_all(&version_table),
                    Mutation::insert(
                        &version_table,
                        Row::new()
                            .with(COL_VERSION, Value::Int64(anchor))
                            .with(COL_DIRTY, Value::Bool(false)),
                    ),
                ]);
                Ok(())
            })
        }
    }))
    .await?;

    if !found_anchor.load(Ordering::SeqCst) {
        return Err(EngineError::NoCleanAnchor);
    }
    Ok(())
}

/// Load the set of versions that already have a history row.
pub(crate) async fn applied_versions(
    db: &dyn Database,
    version_table: &str,
) -> EngineResult<HashSet<i64>> {
    Ok(get_history(db, version_table)
        .await?
        .into_iter()
        .map(|record| record.version)
        .collect())
}
