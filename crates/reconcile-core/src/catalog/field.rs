//! Canonical semantic fields shared by the legacy and structured representations.

use serde::{Deserialize, Serialize};

/// How a field's value is interpreted after its label is stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Kept as a string, but unit suffixes are stripped and decimal commas normalized.
    Numeric,
    /// Free text, trimmed only.
    Text,
    /// Calendar date, normalized to ISO `YYYY-MM-DD` when recognizable.
    Date,
}

/// A semantic field, independent of how it was spelled in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    // Measurement identity
    Inverter,
    Mppt,
    StringIndex,
    // Measurement values
    Voc,
    Vmpp,
    Isc,
    Impp,
    InsulationResistance,
    Irradiance,
    Temperature,
    // Punch-list
    Item,
    Description,
    Severity,
    ResponsibleParty,
    OpenDate,
    CloseDate,
    Status,
    // Shared
    Notes,
}

impl CanonicalField {
    /// Key used in rendered output.
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::Inverter => "inverter",
            CanonicalField::Mppt => "mppt",
            CanonicalField::StringIndex => "string",
            CanonicalField::Voc => "voc",
            CanonicalField::Vmpp => "vmpp",
            CanonicalField::Isc => "isc",
            CanonicalField::Impp => "impp",
            CanonicalField::InsulationResistance => "insulationResistance",
            CanonicalField::Irradiance => "irradiance",
            CanonicalField::Temperature => "temperature",
            CanonicalField::Item => "item",
            CanonicalField::Description => "description",
            CanonicalField::Severity => "severity",
            CanonicalField::ResponsibleParty => "responsibleParty",
            CanonicalField::OpenDate => "openDate",
            CanonicalField::CloseDate => "closeDate",
            CanonicalField::Status => "status",
            CanonicalField::Notes => "notes",
        }
    }

    /// Column name in the structured tables.
    pub fn column(&self) -> &'static str {
        match self {
            CanonicalField::Inverter => "inverter_index",
            CanonicalField::Mppt => "mppt_index",
            CanonicalField::StringIndex => "string_index",
            CanonicalField::Voc => "voc",
            CanonicalField::Vmpp => "vmpp",
            CanonicalField::Isc => "isc",
            CanonicalField::Impp => "impp",
            CanonicalField::InsulationResistance => "insulation_resistance",
            CanonicalField::Irradiance => "irradiance",
            CanonicalField::Temperature => "temperature",
            CanonicalField::Item => "item_number",
            CanonicalField::Description => "description",
            CanonicalField::Severity => "severity",
            CanonicalField::ResponsibleParty => "responsible_party",
            CanonicalField::OpenDate => "open_date",
            CanonicalField::CloseDate => "close_date",
            CanonicalField::Status => "status",
            CanonicalField::Notes => "notes",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            CanonicalField::Mppt
            | CanonicalField::StringIndex
            | CanonicalField::Voc
            | CanonicalField::Vmpp
            | CanonicalField::Isc
            | CanonicalField::Impp
            | CanonicalField::InsulationResistance
            | CanonicalField::Irradiance
            | CanonicalField::Temperature
            | CanonicalField::Item => ValueKind::Numeric,
            CanonicalField::OpenDate | CanonicalField::CloseDate => ValueKind::Date,
            CanonicalField::Inverter
            | CanonicalField::Description
            | CanonicalField::Severity
            | CanonicalField::ResponsibleParty
            | CanonicalField::Status
            | CanonicalField::Notes => ValueKind::Text,
        }
    }

    /// Fields that only feed the composite identity and are not rendered as values.
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            CanonicalField::Inverter | CanonicalField::Mppt | CanonicalField::StringIndex
        )
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
