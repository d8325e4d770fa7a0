//! Row, value and mutation model
//!
//! A deliberately small data model: the migration engine only ever stores
//! integers, booleans, strings and timestamps in its tracking tables. The
//! [`Value::CommitTimestamp`] sentinel is replaced by the backend with the
//! transaction's commit time, so the engine never reads a clock when writing
//! history rows.

use chrono::{DateTime, Utc};

use crate::error::{DbError, DbResult};

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Int64(i64),
    Bool(bool),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Resolved to the commit time when the enclosing transaction commits
    CommitTimestamp,
    Null,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A primary-key value list.
pub type Key = Vec<Value>;

/// The rows a delete mutation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySet {
    /// Every row in the table
    All,
    /// The listed keys; missing keys are ignored
    Keys(Vec<Key>),
}

/// A named-column row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append. A repeated name overwrites the earlier
    /// value.
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(entry) = self.columns.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.columns.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_i64(&self, name: &str) -> DbResult<i64> {
        self.get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed(name))
    }

    pub fn get_bool(&self, name: &str) -> DbResult<bool> {
        self.get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| malformed(name))
    }

    pub fn get_timestamp(&self, name: &str) -> DbResult<DateTime<Utc>> {
        self.get(name)
            .and_then(Value::as_timestamp)
            .ok_or_else(|| malformed(name))
    }

    /// Nullable string column: `Ok(None)` for SQL NULL.
    pub fn get_opt_string(&self, name: &str) -> DbResult<Option<String>> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(malformed(name)),
        }
    }

    /// Nullable timestamp column: `Ok(None)` for SQL NULL.
    pub fn get_opt_timestamp(&self, name: &str) -> DbResult<Option<DateTime<Utc>>> {
        match self.get(name) {
            Some(Value::Timestamp(t)) => Ok(Some(*t)),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(malformed(name)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }
}

fn malformed(column: &str) -> DbError {
    DbError::MalformedRow {
        column: column.to_string(),
    }
}

/// A buffered write, applied atomically when its transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Fails if the key already exists
    Insert { table: String, row: Row },
    /// Merges columns into an existing row; fails if the key is missing
    Update { table: String, row: Row },
    /// Insert, or merge into the existing row
    InsertOrUpdate { table: String, row: Row },
    /// Remove the targeted rows
    Delete { table: String, keys: KeySet },
}

impl Mutation {
    pub fn insert(table: &str, row: Row) -> Self {
        Mutation::Insert {
            table: table.to_string(),
            row,
        }
    }

    pub fn update(table: &str, row: Row) -> Self {
        Mutation::Update {
            table: table.to_string(),
            row,
        }
    }

    pub fn insert_or_update(table: &str, row: Row) -> Self {
        Mutation::InsertOrUpdate {
            table: table.to_string(),
            row,
        }
    }

    pub fn delete(table: &str, keys: KeySet) -> Self {
        Mutation::Delete {
            table: table.to_string(),
            keys,
        }
    }

    pub fn delete_all(table: &str) -> Self {
        Mutation::delete(table, KeySet::All)
    }
}
