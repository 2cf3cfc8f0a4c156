//! Assembles typed records from legacy equipment rows.

use super::normalizer::LabelNormalizer;
use super::tokenizer::tokenize;
use super::values::leading_integer;
use crate::catalog::{CanonicalField, FieldCatalogue};
use crate::config::IdentityConfig;
use crate::models::{
    FieldValues, LegacyEquipmentRow, LegacyMeasurement, ProvisionalMeasurementIdentity,
    PunchListIdentity, Record,
};

/// Builds records from the characteristics text of legacy rows.
#[derive(Debug, Clone, Copy)]
pub struct LegacyRecordBuilder<'c> {
    normalizer: LabelNormalizer<'c>,
}

impl<'c> LegacyRecordBuilder<'c> {
    pub fn new(catalogue: &'c FieldCatalogue) -> Self {
        Self {
            normalizer: LabelNormalizer::new(catalogue),
        }
    }

    /// Tokenize, normalize and fold into a field map.
    ///
    /// A field seen twice keeps its last value.
    pub fn fields(&self, encoded: Option<&str>) -> FieldValues {
        let mut fields = FieldValues::new();
        for segment in tokenize(encoded) {
            if let Some(normalized) = self.normalizer.normalize(segment) {
                fields.insert(normalized.field, normalized.value);
            }
        }
        fields
    }

    /// Parse a measurement row and derive its provisional identity.
    ///
    /// Missing MPPT or string numbers fall back to the documented defaults
    /// instead of rejecting the row.
    pub fn build_measurement(&self, row: &LegacyEquipmentRow) -> LegacyMeasurement {
        let mut fields = self.fields(row.characteristics.as_deref());

        let inverter_ref = fields
            .remove(&CanonicalField::Inverter)
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let mppt_index = fields
            .remove(&CanonicalField::Mppt)
            .and_then(|v| leading_integer(&v))
            .unwrap_or(IdentityConfig::DEFAULT_MPPT_INDEX);
        let string_index = fields
            .remove(&CanonicalField::StringIndex)
            .and_then(|v| leading_integer(&v))
            .unwrap_or(IdentityConfig::DEFAULT_STRING_INDEX);

        LegacyMeasurement {
            row_id: row.row_id,
            provisional: ProvisionalMeasurementIdentity {
                inverter_ref,
                mppt_index,
                string_index,
            },
            fields,
        }
    }

    /// Parse a punch-list row into a record keyed by `(reportId, description)`.
    ///
    /// Rows written without a description label use their whole text as the
    /// description, so free-form legacy notes still form a key.
    pub fn build_punch_item(&self, row: &LegacyEquipmentRow) -> Record<PunchListIdentity> {
        let mut fields = self.fields(row.characteristics.as_deref());

        let description = fields
            .get(&CanonicalField::Description)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| {
                row.characteristics
                    .as_deref()
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            });
        fields.insert(CanonicalField::Description, description.clone());

        Record::with_fields(PunchListIdentity::new(row.report_id, description), fields)
    }
}
