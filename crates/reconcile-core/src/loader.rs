//! Converts structured rows into records keyed by their own identity columns.

use crate::catalog::CanonicalField;
use crate::models::{
    FieldValues, MeasurementIdentity, PunchListIdentity, Record, StructuredMeasurementRow,
    StructuredPunchItemRow,
};
use std::collections::BTreeMap;

fn present_values(values: &BTreeMap<CanonicalField, Option<String>>) -> FieldValues {
    values
        .iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (*field, v.clone())))
        .collect()
}

/// Overlay records for string measurements. Structured rows already carry
/// positional identity, so no resolution is needed.
pub fn measurement_records(rows: &[StructuredMeasurementRow]) -> Vec<Record<MeasurementIdentity>> {
    rows.iter()
        .map(|row| {
            Record::with_fields(
                MeasurementIdentity::new(
                    row.inverter_index as usize,
                    row.mppt_index,
                    row.string_index,
                ),
                present_values(&row.values),
            )
        })
        .collect()
}

/// Overlay records for punch-list items.
pub fn punch_item_records(rows: &[StructuredPunchItemRow]) -> Vec<Record<PunchListIdentity>> {
    rows.iter()
        .map(|row| {
            let identity = PunchListIdentity::new(row.report_id, row.description.as_str());
            let mut fields = present_values(&row.values);
            fields.insert(CanonicalField::Description, identity.description.clone());
            Record::with_fields(identity, fields)
        })
        .collect()
}
