//! Rows read from the external relational store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::CanonicalField;

/// A generic equipment row carrying the legacy characteristics encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEquipmentRow {
    pub row_id: i64,
    pub report_id: i64,
    pub equipment_type: String,
    #[serde(default)]
    pub characteristics: Option<String>,
    #[serde(default)]
    pub created_index: Option<i64>,
}

/// One row of the structured measurement table.
///
/// Values are already rendered as strings; `None` means NULL or a missing column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredMeasurementRow {
    pub row_id: i64,
    pub report_id: i64,
    pub inverter_index: u32,
    pub mppt_index: u32,
    pub string_index: u32,
    pub values: BTreeMap<CanonicalField, Option<String>>,
}

/// One row of the structured punch-list table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredPunchItemRow {
    pub row_id: i64,
    pub report_id: i64,
    pub description: String,
    pub values: BTreeMap<CanonicalField, Option<String>>,
}

/// A referenced entity in canonical order, e.g. an inverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEntity {
    pub entity_id: i64,
    /// Stable key the legacy text refers to (the model identifier), when recorded.
    #[serde(default)]
    pub key: Option<String>,
}
