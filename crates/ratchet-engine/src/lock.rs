//! Advisory migration lock
//!
//! A single-row table keyed on NULL guards concurrent migrate runs. The
//! holder writes its identifier with a 30-minute expiry; a crashed holder
//! therefore stalls other operators for at most that long. The lock is
//! advisory: exclusivity is only promised until the expiry passes.

use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};

use ratchet_db::{Database, Mutation, Row, Value};

use crate::error::EngineResult;

/// How long an acquired lock is honoured before other operators may steal it.
pub const LOCK_TTL_MINUTES: i64 = 30;

const COL_ID: &str = "ID";
const COL_LOCK_IDENTIFIER: &str = "LockIdentifier";
const COL_EXPIRY: &str = "Expiry";

/// Name of the lock table paired with `version_table`.
pub fn lock_table_name(version_table: &str) -> String {
    format!("{version_table}Lock")
}

/// The result of a lock acquisition attempt.
///
/// Callers must invoke [`MigrationLock::release`] when done, on the error
/// path included; release is best-effort and never fails the surrounding
/// operation.
#[derive(Debug, Clone)]
pub struct MigrationLock {
    /// Whether this process now holds the lock
    pub acquired: bool,
    /// The identifier recorded in the lock row after the attempt
    pub holder: String,
    /// When the recorded hold expires
    pub expiry: Option<DateTime<Utc>>,
    /// `None` when the lock table does not exist (single-operator mode)
    table: Option<String>,
    identifier: String,
}

#[derive(Default)]
struct AcquireOutcome {
    acquired: bool,
    holder: String,
    expiry: Option<DateTime<Utc>>,
}

/// Try to take the migration lock for `identifier`.
///
/// When the lock table has never been set up, acquisition trivially succeeds
/// with a no-op release, so deployments that never ran `setup-lock` keep
/// working.
pub async fn acquire(
    db: &dyn Database,
    table: &str,
    identifier: &str,
) -> EngineResult<MigrationLock> {
    if !db.table_exists(table).await? {
        return Ok(MigrationLock {
            acquired: true,
            holder: identifier.to_string(),
            expiry: None,
            table: None,
            identifier: identifier.to_string(),
        });
    }

    let outcome = Arc::new(StdMutex::new(AcquireOutcome::default()));
    let table_name = table.to_string();
    let id = identifier.to_string();
    db.read_write_txn(Box::new({
        let outcome = Arc::clone(&outcome);
        move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let row = txn.read_row(&table_name, &vec![Value::Null]).await?;
                let current_holder = match &row {
                    Some(row) => row.get_opt_string(COL_LOCK_IDENTIFIER)?,
                    None => None,
                };
                let current_expiry = match &row {
                    Some(row) => row.get_opt_timestamp(COL_EXPIRY)?,
                    None => None,
                };

                let free = current_holder.is_none()
                    || current_expiry.map_or(true, |expiry| now > expiry);
                let mut outcome = outcome.lock().expect("lock outcome mutex");
                if free {
                    let expiry = now + Duration::minutes(LOCK_TTL_MINUTES);
                    txn.buffer_write(vec![Mutation::insert_or_update(
                        &table_name,
                        Row::new()
                            .with(COL_ID, Value::Null)
                            .with(COL_LOCK_IDENTIFIER, Value::String(id.clone()))
                            .with(COL_EXPIRY, Value::Timestamp(expiry)),
                    )]);
                    *outcome = AcquireOutcome {
                        acquired: true,
                        holder: id,
                        expiry: Some(expiry),
                    };
                } else {
                    *outcome = AcquireOutcome {
                        acquired: false,
                        holder: current_holder.unwrap_or_default(),
                        expiry: current_expiry,
                    };
                }
                Ok(())
            })
        }
    }))
    .await?;

    let outcome = outcome.lock().expect("lock outcome mutex");
    Ok(MigrationLock {
        acquired: outcome.acquired,
        holder: outcome.holder.clone(),
        expiry: outcome.expiry,
        table: Some(table.to_string()),
        identifier: identifier.to_string(),
    })
}

impl MigrationLock {
    /// Give the lock back. Only clears the slot while it still records this
    /// holder's identifier; it never steals from a later holder. Failures
    /// are logged and swallowed.
    pub async fn release(&self, db: &dyn Database) {
        let Some(table) = &self.table else {
            return;
        };
        if !self.acquired {
            return;
        }

        let table_name = table.clone();
        let id = self.identifier.clone();
        let result = db
            .read_write_txn(Box::new(move |txn| {
                Box::pin(async move {
                    let row = txn.read_row(&table_name, &vec![Value::Null]).await?;
                    let holder = match &row {
                        Some(row) => row.get_opt_string(COL_LOCK_IDENTIFIER)?,
                        None => None,
                    };
                    if holder.as_deref() == Some(id.as_str()) {
                        txn.buffer_write(vec![Mutation::update(
                            &table_name,
                            Row::new()
                                .with(COL_ID, Value::Null)
                                .with(COL_LOCK_IDENTIFIER, Value::Null)
                                .with(COL_EXPIRY, Value::Null),
                        )]);
                    }
                    Ok(())
                })
            }))
            .await;

        if let Err(e) = result {
            log::warn!("failed to release migration lock: {}", e);
        }
    }
}

pub(crate) async fn create_lock_table(db: &dyn Database, table: &str) -> EngineResult<()> {
    if db.table_exists(table).await? {
        return Ok(());
    }
    let ddl = format!(
        "CREATE TABLE {table}(ID INT64, LockIdentifier STRING(200), Expiry TIMESTAMP) PRIMARY KEY(ID)"
    );
    db.apply_ddl(&[ddl]).await?;
    Ok(())
}

/// Create or reset the lock table, clearing any stale holder.
pub async fn setup_lock(db: &dyn Database, table: &str) -> EngineResult<()> {
    create_lock_table(db, table).await?;

    let table_name = table.to_string();
    db.read_write_txn(Box::new(move |txn| {
        Box::pin(async move {
            let row = txn.read_row(&table_name, &vec![Value::Null]).await?;
            match row {
                None => {
                    txn.buffer_write(vec![Mutation::insert(
                        &table_name,
                        Row::new().with(COL_ID, Value::Null),
                    )]);
                }
                Some(row) => {
                    let holder = row.get_opt_string(COL_LOCK_IDENTIFIER)?.unwrap_or_default();
                    let expiry = row
                        .get_opt_timestamp(COL_EXPIRY)?
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default();
                    println!("clearing lock identifier [{holder}] expiry [{expiry}]");
                    txn.buffer_write(vec![Mutation::update(
                        &table_name,
                        Row::new()
                            .with(COL_ID, Value::Null)
                            .with(COL_LOCK_IDENTIFIER, Value::Null)
                            .with(COL_EXPIRY, Value::Null),
                    )]);
                }
            }
            Ok(())
        })
    }))
    .await?;
    Ok(())
}
