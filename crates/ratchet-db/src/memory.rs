//! In-memory database backend
//!
//! A [`Database`] implementation over an in-process table store. DDL is
//! parsed only far enough to maintain the catalog (`CREATE TABLE` heads with
//! their primary keys, `DROP TABLE`); every statement is also recorded for
//! inspection. DML and partitioned DML are routed through pluggable
//! handlers so tests can script row counts and failures. Transactions are
//! serialised on a single mutex, buffered mutations apply atomically at
//! commit, and commit-timestamp sentinels resolve to the commit time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tokio::sync::Mutex;

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Transaction, TxnWork};
use crate::value::{Key, KeySet, Mutation, Row, Value};

static CREATE_TABLE_PK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+(\w+)\s*\(.*\)\s*PRIMARY\s+KEY\s*\(([^)]*)\)\s*$")
        .expect("static regex")
});
static CREATE_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*CREATE\s+TABLE\s+(\w+)").expect("static regex"));
static DROP_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*DROP\s+TABLE\s+(\w+)").expect("static regex"));

/// Scripted behaviour for DML statements.
pub type StatementHandler = Arc<dyn Fn(&str) -> DbResult<i64> + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct TableData {
    primary_key: Vec<String>,
    rows: BTreeMap<Key, Row>,
}

#[derive(Default)]
struct Store {
    tables: BTreeMap<String, TableData>,
    ddl_log: Vec<String>,
    dml_log: Vec<String>,
}

impl Store {
    fn table(&self, name: &str) -> DbResult<&TableData> {
        self.tables.get(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })
    }

    fn apply_ddl_statement(&mut self, statement: &str) -> DbResult<()> {
        self.ddl_log.push(statement.to_string());

        if let Some(caps) = CREATE_TABLE_PK_RE.captures(statement) {
            return self.create_table(
                &caps[1],
                caps[2]
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            );
        }
        if let Some(caps) = CREATE_TABLE_RE.captures(statement) {
            return self.create_table(&caps[1], Vec::new());
        }
        if let Some(caps) = DROP_TABLE_RE.captures(statement) {
            let name = caps[1].to_string();
            if self.tables.remove(&name).is_none() {
                return Err(DbError::TableNotFound { table: name });
            }
            return Ok(());
        }
        // Anything else (indexes, alters) only needs to be recorded.
        Ok(())
    }

    fn create_table(&mut self, name: &str, primary_key: Vec<String>) -> DbResult<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::AlreadyExists {
                table: name.to_string(),
            });
        }
        self.tables.insert(
            name.to_string(),
            TableData {
                primary_key,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Apply buffered mutations atomically: all of them, or none.
    fn commit(&mut self, mutations: Vec<Mutation>, commit_ts: DateTime<Utc>) -> DbResult<()> {
        let mut tables = self.tables.clone();

        for mutation in mutations {
            match mutation {
                Mutation::Insert { table, row } => {
                    let data = lookup(&mut tables, &table)?;
                    let row = resolve_commit_ts(&row, commit_ts);
                    let key = extract_key(&data.primary_key, &row)?;
                    if data.rows.contains_key(&key) {
                        return Err(DbError::AlreadyExists { table });
                    }
                    data.rows.insert(key, row);
                }
                Mutation::Update { table, row } => {
                    let data = lookup(&mut tables, &table)?;
                    let row = resolve_commit_ts(&row, commit_ts);
                    let key = extract_key(&data.primary_key, &row)?;
                    let Some(existing) = data.rows.get_mut(&key) else {
                        return Err(DbError::RowNotFound { table });
                    };
                    merge(existing, &row);
                }
                Mutation::InsertOrUpdate { table, row } => {
                    let data = lookup(&mut tables, &table)?;
                    let row = resolve_commit_ts(&row, commit_ts);
                    let key = extract_key(&data.primary_key, &row)?;
                    match data.rows.get_mut(&key) {
                        Some(existing) => merge(existing, &row),
                        None => {
                            data.rows.insert(key, row);
                        }
                    }
                }
                Mutation::Delete { table, keys } => {
                    let data = lookup(&mut tables, &table)?;
                    match keys {
                        KeySet::All => data.rows.clear(),
                        KeySet::Keys(keys) => {
                            for key in keys {
                                data.rows.remove(&key);
                            }
                        }
                    }
                }
            }
        }

        self.tables = tables;
        Ok(())
    }
}

fn lookup<'t>(
    tables: &'t mut BTreeMap<String, TableData>,
    name: &str,
) -> DbResult<&'t mut TableData> {
    tables.get_mut(name).ok_or_else(|| DbError::TableNotFound {
        table: name.to_string(),
    })
}

fn resolve_commit_ts(row: &Row, commit_ts: DateTime<Utc>) -> Row {
    let mut resolved = Row::new();
    for (name, value) in row.columns() {
        let value = match value {
            Value::CommitTimestamp => Value::Timestamp(commit_ts),
            other => other.clone(),
        };
        resolved.set(name, value);
    }
    resolved
}

fn extract_key(primary_key: &[String], row: &Row) -> DbResult<Key> {
    primary_key
        .iter()
        .map(|column| {
            row.get(column)
                .cloned()
                .ok_or_else(|| DbError::MalformedRow {
                    column: column.clone(),
                })
        })
        .collect()
}

fn merge(existing: &mut Row, incoming: &Row) {
    for (name, value) in incoming.columns() {
        existing.set(name, value.clone());
    }
}

/// In-memory backend. Cheap to construct per test; share via `Arc` with the
/// engine.
pub struct MemoryBackend {
    store: Mutex<Store>,
    dml_handler: StatementHandler,
    partitioned_handler: StatementHandler,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let noop: StatementHandler = Arc::new(|_| Ok(0));
        Self {
            store: Mutex::new(Store::default()),
            dml_handler: noop.clone(),
            partitioned_handler: noop,
        }
    }

    /// Script transactional DML: the handler returns affected rows or an
    /// error for each statement passed to [`Transaction::update`].
    pub fn with_dml_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> DbResult<i64> + Send + Sync + 'static,
    {
        self.dml_handler = Arc::new(handler);
        self
    }

    /// Script partitioned DML behaviour.
    pub fn with_partitioned_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> DbResult<i64> + Send + Sync + 'static,
    {
        self.partitioned_handler = Arc::new(handler);
        self
    }

    /// Every DDL statement ever submitted, in order.
    pub async fn ddl_log(&self) -> Vec<String> {
        self.store.lock().await.ddl_log.clone()
    }

    /// Every DML statement ever submitted, in order of submission.
    pub async fn dml_log(&self) -> Vec<String> {
        self.store.lock().await.dml_log.clone()
    }
}

struct MemoryTransaction<'g> {
    store: &'g mut Store,
    buffer: Vec<Mutation>,
    dml_handler: StatementHandler,
}

#[async_trait]
impl Transaction for MemoryTransaction<'_> {
    async fn update(&mut self, statement: &str) -> DbResult<i64> {
        self.store.dml_log.push(statement.to_string());
        (self.dml_handler)(statement)
    }

    async fn read_row(&mut self, table: &str, key: &Key) -> DbResult<Option<Row>> {
        Ok(self.store.table(table)?.rows.get(key).cloned())
    }

    async fn read_all(&mut self, table: &str) -> DbResult<Vec<Row>> {
        Ok(self.store.table(table)?.rows.values().cloned().collect())
    }

    fn buffer_write(&mut self, mutations: Vec<Mutation>) {
        self.buffer.extend(mutations);
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn apply_ddl(&self, statements: &[String]) -> DbResult<()> {
        let mut store = self.store.lock().await;
        for statement in statements {
            store.apply_ddl_statement(statement)?;
        }
        Ok(())
    }

    async fn read_write_txn<'a>(&'a self, work: TxnWork<'a>) -> DbResult<()> {
        let mut store = self.store.lock().await;
        let mut txn = MemoryTransaction {
            store: &mut store,
            buffer: Vec::new(),
            dml_handler: self.dml_handler.clone(),
        };
        work(&mut txn).await?;
        let buffer = std::mem::take(&mut txn.buffer);
        store.commit(buffer, Utc::now())
    }

    async fn partitioned_update(&self, statement: &str) -> DbResult<i64> {
        self.store.lock().await.dml_log.push(statement.to_string());
        (self.partitioned_handler)(statement)
    }

    async fn read_all(&self, table: &str) -> DbResult<Vec<Row>> {
        Ok(self
            .store
            .lock()
            .await
            .table(table)?
            .rows
            .values()
            .cloned()
            .collect())
    }

    async fn table_exists(&self, table: &str) -> DbResult<bool> {
        Ok(self.store.lock().await.tables.contains_key(table))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
