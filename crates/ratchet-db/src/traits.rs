//! Database trait definition
//!
//! The seam between the migration engine and a concrete database client.
//! Implementations must be Send + Sync for async operation. Conditional
//! multi-step logic (the migration lock, version bookkeeping) runs inside
//! [`Database::read_write_txn`]; everything buffered through
//! [`Transaction::buffer_write`] is applied atomically at commit, and reads
//! inside the transaction observe pre-transaction state.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::DbResult;
use crate::value::{Key, Mutation, Row};

/// Work executed inside a read-write transaction. Returning an error rolls
/// the transaction back; buffered mutations are discarded.
pub type TxnWork<'a> =
    Box<dyn for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, DbResult<()>> + Send + 'a>;

/// Database abstraction for the migration engine.
#[async_trait]
pub trait Database: Send + Sync {
    /// Submit a batch of DDL statements as one atomic schema change.
    async fn apply_ddl(&self, statements: &[String]) -> DbResult<()>;

    /// Run `work` inside a read-write transaction.
    async fn read_write_txn<'a>(&'a self, work: TxnWork<'a>) -> DbResult<()>;

    /// Execute a single statement as partitioned DML, returning the number
    /// of affected rows. Not atomic across partitions.
    async fn partitioned_update(&self, statement: &str) -> DbResult<i64>;

    /// Strong single-use read of every row in `table`, in primary-key order.
    async fn read_all(&self, table: &str) -> DbResult<Vec<Row>>;

    /// Catalog probe.
    async fn table_exists(&self, table: &str) -> DbResult<bool>;
}

/// Operations available inside [`Database::read_write_txn`].
#[async_trait]
pub trait Transaction: Send {
    /// Execute a DML statement transactionally, returning affected rows.
    async fn update(&mut self, statement: &str) -> DbResult<i64>;

    /// Keyed read. Sees pre-transaction state, not buffered writes.
    async fn read_row(&mut self, table: &str, key: &Key) -> DbResult<Option<Row>>;

    /// Read every row of `table`, in primary-key order.
    async fn read_all(&mut self, table: &str) -> DbResult<Vec<Row>>;

    /// Queue mutations for atomic application at commit.
    fn buffer_write(&mut self, mutations: Vec<Mutation>);
}
