//! Composite identities and the generic record the merge engine works on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::CanonicalField;

/// Field values of one record. An absent key means the value is null.
pub type FieldValues = BTreeMap<CanonicalField, String>;

/// Identity of a string measurement: inverter position, MPPT, string.
///
/// Ordering is lexicographic over the tuple, which is the render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementIdentity {
    pub inverter_index: usize,
    pub mppt_index: u32,
    pub string_index: u32,
}

impl MeasurementIdentity {
    pub fn new(inverter_index: usize, mppt_index: u32, string_index: u32) -> Self {
        Self {
            inverter_index,
            mppt_index,
            string_index,
        }
    }
}

/// Natural key of a punch-list item.
///
/// Best effort: the legacy encoding never carried a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchListIdentity {
    pub report_id: i64,
    pub description: String,
}

impl PunchListIdentity {
    pub fn new(report_id: i64, description: impl Into<String>) -> Self {
        Self {
            report_id,
            description: description.into().trim().to_string(),
        }
    }
}

/// A record keyed by a composite identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<I> {
    pub identity: I,
    pub fields: FieldValues,
}

impl<I> Record<I> {
    pub fn new(identity: I) -> Self {
        Self {
            identity,
            fields: FieldValues::new(),
        }
    }

    pub fn with_fields(identity: I, fields: FieldValues) -> Self {
        Self { identity, fields }
    }

    /// Value of a field, with empty strings treated as absent.
    pub fn value(&self, field: CanonicalField) -> Option<&str> {
        self.fields
            .get(&field)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Identity reference of a legacy measurement row before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalMeasurementIdentity {
    /// Free-text inverter reference, usually a model identifier.
    pub inverter_ref: Option<String>,
    pub mppt_index: u32,
    pub string_index: u32,
}

/// A legacy measurement row after parsing, awaiting identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMeasurement {
    pub row_id: i64,
    pub provisional: ProvisionalMeasurementIdentity,
    pub fields: FieldValues,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_identity_order() {
        let mut ids = vec![
            MeasurementIdentity::new(1, 1, 1),
            MeasurementIdentity::new(0, 2, 1),
            MeasurementIdentity::new(0, 1, 3),
            MeasurementIdentity::new(0, 1, 2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                MeasurementIdentity::new(0, 1, 2),
                MeasurementIdentity::new(0, 1, 3),
                MeasurementIdentity::new(0, 2, 1),
                MeasurementIdentity::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn test_punch_identity_trims_description() {
        assert_eq!(
            PunchListIdentity::new(7, "  Loose MC4 connector "),
            PunchListIdentity::new(7, "Loose MC4 connector")
        );
    }

    #[test]
    fn test_blank_value_reads_as_absent() {
        let mut record = Record::new(MeasurementIdentity::new(0, 1, 1));
        record.fields.insert(CanonicalField::Notes, "  ".to_string());
        record.fields.insert(CanonicalField::Voc, "600".to_string());
        assert_eq!(record.value(CanonicalField::Notes), None);
        assert_eq!(record.value(CanonicalField::Voc), Some("600"));
    }
}
