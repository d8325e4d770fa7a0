//! ratchet-db - Database abstraction layer for ratchet
//!
//! This crate defines the `Database` and `Transaction` traits the migration
//! engine drives, the row/value/mutation model shared with backends, and an
//! in-memory backend used for tests and dry runs. Real deployments implement
//! [`Database`] on top of their database client library.

pub mod error;
pub mod memory;
pub mod traits;
pub mod value;

pub use error::{DbError, DbResult};
pub use memory::MemoryBackend;
pub use traits::{Database, Transaction, TxnWork};
pub use value::{Key, KeySet, Mutation, Row, Value};
