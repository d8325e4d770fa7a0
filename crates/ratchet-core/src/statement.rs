//! Statement classification
//!
//! Decides, per statement and per file, whether migration SQL is DDL,
//! transactional DML, or partition-parallel DML. Detection is a syntactic
//! approximation: INSERTs and UPDATE/DELETE statements with a nested SELECT
//! are never treated as partitionable.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, CoreResult};

static DML_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(UPDATE|DELETE|INSERT)[\t\n\x0C\r ]").expect("static regex"));

// INSERT statements cannot be partitioned, and an UPDATE or DELETE with a
// SELECT in the WHERE clause is not fully partitionable either.
static NOT_PARTITIONED_DML_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:insert)|(?:update|delete).*select").expect("static regex")
});

/// The execution mode of a migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Schema-changing statements, submitted as one atomic DDL batch
    Ddl,
    /// Data statements executed inside a single read-write transaction
    Dml,
    /// UPDATE/DELETE statements executed as partition-level transactions
    PartitionedDml,
    /// Partitioned DML re-submitted until it reports zero affected rows
    ConvergentDml,
    /// A directive tag this release does not know how to execute
    Other(String),
}

impl StatementKind {
    /// Map a directive tag to a kind. Unrecognised tags are carried through
    /// as [`StatementKind::Other`] so the coordinator can reject them with
    /// the offending migration's context.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "DDL" => StatementKind::Ddl,
            "DML" => StatementKind::Dml,
            "PartitionedDML" => StatementKind::PartitionedDml,
            "ConvergentDML" => StatementKind::ConvergentDml,
            other => StatementKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Ddl => write!(f, "DDL"),
            StatementKind::Dml => write!(f, "DML"),
            StatementKind::PartitionedDml => write!(f, "PartitionedDML"),
            StatementKind::ConvergentDml => write!(f, "ConvergentDML"),
            StatementKind::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// Classify a single statement.
pub fn statement_kind(statement: &str) -> StatementKind {
    if is_partitioned_dml_only(statement) {
        return StatementKind::PartitionedDml;
    }
    if is_dml_any(statement) {
        return StatementKind::Dml;
    }
    StatementKind::Ddl
}

fn is_partitioned_dml_only(statement: &str) -> bool {
    is_dml_any(statement) && !NOT_PARTITIONED_DML_RE.is_match(statement)
}

fn is_dml_any(statement: &str) -> bool {
    DML_ANY_RE.is_match(statement)
}

/// Determine the single kind shared by every statement in a file.
///
/// With `detect_partitioned` off, plain and partitioned DML coalesce to
/// [`StatementKind::Dml`]. A file with no statements counts as DDL (a no-op
/// that still records a version bump). Mixing DDL with DML in one file fails
/// with [`CoreError::MixedStatementKinds`].
pub fn inspect_kind(
    file_name: &str,
    statements: &[String],
    detect_partitioned: bool,
) -> CoreResult<StatementKind> {
    let mut ddl = 0u64;
    let mut dml = 0u64;
    let mut partitioned = 0u64;
    for s in statements {
        match statement_kind(s) {
            StatementKind::Ddl => ddl += 1,
            StatementKind::Dml => dml += 1,
            StatementKind::PartitionedDml => partitioned += 1,
            // statement_kind only produces the three base kinds
            _ => unreachable!(),
        }
    }
    let total = ddl + dml + partitioned;

    if ddl == total {
        return Ok(StatementKind::Ddl);
    }
    if !detect_partitioned && dml + partitioned == total {
        return Ok(StatementKind::Dml);
    }
    if detect_partitioned && dml == total {
        return Ok(StatementKind::Dml);
    }
    if detect_partitioned && partitioned == total {
        return Ok(StatementKind::PartitionedDml);
    }

    Err(CoreError::MixedStatementKinds {
        file_name: file_name.to_string(),
    })
}

#[cfg(test)]
#[path = "statement_test.rs"]
mod tests;
