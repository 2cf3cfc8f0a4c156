//! Access to the external relational store.
//!
//! The engine only depends on the traits; `SqliteStore` is the adapter used
//! by the command-line driver and the integration tests.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{MigrationTarget, PlannedStatement, ReportSource, RowWrite, SqlParam};
