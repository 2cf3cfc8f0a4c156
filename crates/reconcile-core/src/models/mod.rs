//! Data models for the reconciliation engine.
//!
//! `rows` holds what the external store hands in; `record` holds the
//! per-invocation records the engine builds, merges and assembles.

mod record;
mod rows;

pub use record::*;
pub use rows::*;
