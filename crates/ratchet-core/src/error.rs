//! Error types for ratchet-core

use thiserror::Error;

/// Core error type for migration loading and parsing
#[derive(Error, Debug)]
pub enum CoreError {
    /// M001: End of input or end of line reached inside a string literal
    #[error("[M001] statement contains an unclosed literal: {statement}")]
    UnclosedLiteral { statement: String },

    /// M002: Directive key is not recognised
    #[error("[M002] unknown migration directive: {key}")]
    UnknownDirective { key: String },

    /// M003: Directive value failed validation
    #[error("[M003] invalid value for directive {key}: {value}")]
    InvalidDirectiveValue { key: String, value: String },

    /// M004: A migration file mixes DDL and DML statements
    #[error("[M004] cannot mix DDL and DML statements in one migration file: {file_name}")]
    MixedStatementKinds { file_name: String },

    /// M005: Two migration files share a version number
    #[error("[M005] migration {version} in {file_name} has a duplicate version number of {other_file_name}")]
    DuplicateVersion {
        version: u64,
        file_name: String,
        other_file_name: String,
    },

    /// M006: Migration name contains characters outside [A-Za-z0-9_-]
    #[error("[M006] invalid migration name: {name}")]
    InvalidMigrationName { name: String },

    /// M007: Sequence interval must be a positive integer
    #[error("[M007] invalid sequence interval: {interval}")]
    InvalidInterval { interval: u64 },

    /// M008: IO error with file path context
    #[error("[M008] failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// M009: IO error
    #[error("[M009] IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
