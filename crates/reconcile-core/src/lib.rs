//! Reconcile Core - Headless engine for merging legacy commissioning data.
//!
//! Older PV commissioning reports stored string measurements and punch-list
//! items as pipe-delimited free text on generic equipment rows. Newer reports
//! use typed tables. This crate parses the legacy text, resolves it to the
//! same composite identities the typed rows use, merges both sides with the
//! typed rows taking priority, and migrates legacy punch-list rows into their
//! table.
//!
//! # Example
//!
//! ```rust,no_run
//! use reconcile_core::{EngineConfig, Reconciler, SqliteStore};
//!
//! fn main() -> reconcile_core::Result<()> {
//!     let store = SqliteStore::open("/path/to/commissioning.sqlite")?;
//!     let reconciler = Reconciler::new(&store, EngineConfig::default());
//!
//!     let result = reconciler.reconcile_measurements(42);
//!     println!("{} strings", result.records.len());
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod loader;
pub mod merge;
pub mod migration;
pub mod models;
pub mod parse;
pub mod reconciler;
pub mod store;

// Re-export commonly used types
pub use assemble::{MeasurementOutput, PunchListOutput};
pub use catalog::{CanonicalField, FieldCatalogue, FieldSpec, ValueKind};
pub use config::{EngineConfig, IdentityConfig, LegacyTagConfig, SchemaConfig};
pub use error::{ReconcileError, Result};
pub use identity::{IdentityResolver, Resolution, ResolutionOutcome};
pub use merge::{merge, MergeOutcome, MergeStats};
pub use migration::{MigrationDriver, MigrationMode, MigrationReport, RowMigration, RowOutcome};
pub use models::{
    CanonicalEntity, LegacyEquipmentRow, MeasurementIdentity, PunchListIdentity, Record,
    StructuredMeasurementRow, StructuredPunchItemRow,
};
pub use parse::{tokenize, LabelNormalizer, LegacyRecordBuilder};
pub use reconciler::{Diagnostics, Reconciler, Reconciliation, UnresolvedReference};
pub use store::{MigrationTarget, PlannedStatement, ReportSource, RowWrite, SqlParam, SqliteStore};
