//! Command implementations

pub mod migrate;
