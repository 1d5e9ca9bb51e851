//! Persistence layer: libSQL storage for progressive quiz tracking.

pub mod libsql_backend;
pub mod migrations;

pub use libsql_backend::LibSqlStore;
