//! Error types for ratchet-engine

use ratchet_core::CoreError;
use ratchet_db::DbError;
use thiserror::Error;

/// Engine error type for migration execution
#[derive(Error, Debug)]
pub enum EngineError {
    /// R001: The migration lock is held by another operator
    #[error("[R001] migration lock is held by {holder}, expires {expiry}")]
    LockContention { holder: String, expiry: String },

    /// R002: A previous migration attempt never completed
    #[error("[R002] database version {version} is dirty, run repair first")]
    DirtyMigration { version: i64 },

    /// R003: The catalog shows an unreachable combination of tracking tables
    #[error("[R003] tracking tables are in an undetermined state: {detail}")]
    UndeterminedState { detail: String },

    /// R004: The version table has no row
    #[error("[R004] no migration has been applied yet")]
    NoMigration,

    /// R005: Repair found no clean version to restore
    #[error("[R005] no clean version found, repair cannot proceed")]
    NoCleanAnchor,

    /// R006: A migration carries a kind no executor branch handles
    #[error("[R006] migration {version} has unknown statement kind: {kind}")]
    UnknownKind { version: u64, kind: String },

    /// R007: The database rejected a migration's statements
    #[error("[R007] migration {file_name} failed: {source}")]
    ExecutionFailure {
        file_name: String,
        #[source]
        source: DbError,
    },

    /// R008: History was requested before any migration created the table
    #[error("[R008] migration history table not found, run a migration to enable history")]
    HistoryNotFound,

    /// R009: Options failed validation
    #[error("[R009] invalid options: {message}")]
    InvalidOptions { message: String },

    /// Migration loading or parsing failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database access failed outside a migration's own statements
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
