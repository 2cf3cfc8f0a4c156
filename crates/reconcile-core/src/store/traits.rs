//! Store traits the engine reads from and the migration driver writes to.

use crate::error::Result;
use crate::models::{
    CanonicalEntity, LegacyEquipmentRow, StructuredMeasurementRow, StructuredPunchItemRow,
};
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A bound statement parameter, kept serializable for dry-run previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Integer(i64),
    Text(String),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Null => rusqlite::types::Null.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
            SqlParam::Text(s) => s.to_sql(),
        }
    }
}

impl std::fmt::Display for SqlParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlParam::Null => write!(f, "NULL"),
            SqlParam::Integer(i) => write!(f, "{}", i),
            SqlParam::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// SQL text with positional parameters, exactly as it will be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStatement {
    pub sql: String,
    pub values: Vec<SqlParam>,
}

/// The writes for one legacy row, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWrite {
    /// Structured insert; `None` when the item already exists.
    pub insert: Option<PlannedStatement>,
    /// Tag update marking the legacy row as migrated. Must affect exactly one row.
    pub mark: PlannedStatement,
}

/// Read-only access to one report's rows.
///
/// All operations are synchronous to match rusqlite's API.
pub trait ReportSource {
    /// Legacy rows whose equipment tag equals `equipment_type` exactly,
    /// in creation order.
    fn legacy_rows(&self, report_id: i64, equipment_type: &str) -> Result<Vec<LegacyEquipmentRow>>;

    /// Inverters in canonical (creation) order.
    fn inverters(&self, report_id: i64) -> Result<Vec<CanonicalEntity>>;

    fn structured_measurements(&self, report_id: i64) -> Result<Vec<StructuredMeasurementRow>>;

    fn structured_punch_items(&self, report_id: i64) -> Result<Vec<StructuredPunchItemRow>>;
}

/// Destination of the punch-list migration.
pub trait MigrationTarget {
    /// Un-migrated rows, optionally limited to one report.
    fn pending_legacy_rows(
        &self,
        equipment_type: &str,
        report_id: Option<i64>,
    ) -> Result<Vec<LegacyEquipmentRow>>;

    /// Columns the destination table actually has. Empty if it does not exist.
    fn destination_columns(&self) -> Result<BTreeSet<String>>;

    fn natural_key_exists(&self, report_id: i64, description: &str) -> Result<bool>;

    /// Apply one row's writes in a single transaction.
    fn commit_row(&self, write: &RowWrite) -> Result<()>;
}
