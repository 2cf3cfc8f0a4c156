//! Orders merged records and adds presentation-only fields for rendering.

use crate::catalog::{CanonicalField, FieldCatalogue};
use crate::merge::render_fields;
use crate::models::{MeasurementIdentity, PunchListIdentity, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A merged string measurement as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementOutput {
    #[serde(flatten)]
    pub identity: MeasurementIdentity,
    /// 1-based inverter number for display.
    pub inverter_number: usize,
    /// Every catalogue value field, empty when unknown.
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
}

/// A merged punch-list item as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchListOutput {
    #[serde(flatten)]
    pub identity: PunchListIdentity,
    /// 1-based position in the rendered list.
    pub item_number: usize,
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
}

/// Records in (inverter, MPPT, string) order with every value field rendered.
pub fn measurements(
    records: BTreeMap<MeasurementIdentity, Record<MeasurementIdentity>>,
    catalogue: &FieldCatalogue,
) -> Vec<MeasurementOutput> {
    let fields = catalogue.value_fields();
    // Keyed by identity, so values come out in render order.
    records
        .into_values()
        .map(|record| MeasurementOutput {
            identity: record.identity,
            inverter_number: record.identity.inverter_index + 1,
            values: render_fields(&record, &fields),
        })
        .collect()
}

/// Records in (report, description) order, numbered from 1.
pub fn punch_items(
    records: BTreeMap<PunchListIdentity, Record<PunchListIdentity>>,
    catalogue: &FieldCatalogue,
) -> Vec<PunchListOutput> {
    // The description is part of the identity and is not repeated as a value.
    let fields: Vec<CanonicalField> = catalogue
        .value_fields()
        .into_iter()
        .filter(|f| *f != CanonicalField::Description)
        .collect();
    records
        .into_values()
        .enumerate()
        .map(|(position, record)| PunchListOutput {
            item_number: position + 1,
            values: render_fields(&record, &fields),
            identity: record.identity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValues;

    fn measurement(id: (usize, u32, u32), voc: &str) -> (MeasurementIdentity, Record<MeasurementIdentity>) {
        let identity = MeasurementIdentity::new(id.0, id.1, id.2);
        let fields = FieldValues::from([(CanonicalField::Voc, voc.to_string())]);
        (identity, Record::with_fields(identity, fields))
    }

    #[test]
    fn test_measurements_are_ordered_and_numbered() {
        let records = BTreeMap::from([
            measurement((1, 1, 1), "590"),
            measurement((0, 2, 1), "600"),
            measurement((0, 1, 2), "605"),
        ]);

        let out = measurements(records, FieldCatalogue::measurement());
        let ids: Vec<_> = out.iter().map(|m| m.identity).collect();
        assert_eq!(
            ids,
            vec![
                MeasurementIdentity::new(0, 1, 2),
                MeasurementIdentity::new(0, 2, 1),
                MeasurementIdentity::new(1, 1, 1),
            ]
        );
        assert_eq!(out[2].inverter_number, 2);
        assert_eq!(out[0].values["voc"], "605");
        assert_eq!(out[0].values["isc"], "");
        assert!(!out[0].values.contains_key("inverter"));
    }

    #[test]
    fn test_measurement_json_shape() {
        let records = BTreeMap::from([measurement((0, 2, 3), "600")]);
        let out = measurements(records, FieldCatalogue::measurement());
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["inverterIndex"], 0);
        assert_eq!(json["mpptIndex"], 2);
        assert_eq!(json["stringIndex"], 3);
        assert_eq!(json["inverterNumber"], 1);
        assert_eq!(json["voc"], "600");
    }

    #[test]
    fn test_punch_items_numbered_from_one() {
        let a = PunchListIdentity::new(1, "B issue");
        let b = PunchListIdentity::new(1, "A issue");
        let records = BTreeMap::from([
            (a.clone(), Record::new(a)),
            (b.clone(), Record::new(b)),
        ]);

        let out = punch_items(records, FieldCatalogue::punch_list());
        assert_eq!(out[0].identity.description, "A issue");
        assert_eq!(out[0].item_number, 1);
        assert_eq!(out[1].item_number, 2);
        assert!(!out[0].values.contains_key("description"));
        assert_eq!(out[0].values["severity"], "");
    }
}
