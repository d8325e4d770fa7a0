//! Error types for ratchet-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// D001: Table does not exist
    #[error("[D001] table not found: {table}")]
    TableNotFound { table: String },

    /// D002: Insert collided with an existing row
    #[error("[D002] row already exists in {table}")]
    AlreadyExists { table: String },

    /// D003: Update targeted a missing row
    #[error("[D003] row not found in {table}")]
    RowNotFound { table: String },

    /// D004: A row is missing a column or holds the wrong type
    #[error("[D004] malformed row: column {column}")]
    MalformedRow { column: String },

    /// D005: Statement execution failed
    #[error("[D005] statement execution failed: {message}: {statement}")]
    ExecutionFailed { statement: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
