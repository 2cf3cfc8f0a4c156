//! Label catalogues for the legacy characteristics encoding.
//!
//! A catalogue is an ordered table of canonical fields, each with the label
//! spellings accepted for it and the unit tokens stripped from its values.
//! Order is significant: the normalizer takes the first field whose label
//! matches, so a spelling listed under two fields belongs to the earlier one.
//!
//! Two built-in catalogues exist, one per instantiation of the engine:
//! [`FieldCatalogue::measurement`] and [`FieldCatalogue::punch_list`].

mod field;

pub use field::{CanonicalField, ValueKind};

use crate::error::{ReconcileError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Declarative description of one catalogue entry.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: CanonicalField,
    pub labels: Vec<String>,
    pub units: Vec<String>,
}

impl FieldSpec {
    pub fn new(field: CanonicalField, labels: &[&str], units: &[&str]) -> Self {
        Self {
            field,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            units: units.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A compiled catalogue entry.
#[derive(Debug)]
pub(crate) struct CatalogueEntry {
    pub(crate) field: CanonicalField,
    /// `^label\s*:(value)$`, case-insensitive.
    pub(crate) label_pattern: Regex,
    /// `^(number)\s*unit$`, case-insensitive; only set for fields with units.
    pub(crate) unit_pattern: Option<Regex>,
}

/// An ordered, immutable set of field specs with their compiled patterns.
#[derive(Debug)]
pub struct FieldCatalogue {
    entries: Vec<CatalogueEntry>,
}

static MEASUREMENT_CATALOGUE: LazyLock<FieldCatalogue> = LazyLock::new(|| {
    FieldCatalogue::new(measurement_specs()).expect("built-in measurement catalogue compiles")
});

static PUNCH_LIST_CATALOGUE: LazyLock<FieldCatalogue> = LazyLock::new(|| {
    FieldCatalogue::new(punch_list_specs()).expect("built-in punch-list catalogue compiles")
});

impl FieldCatalogue {
    /// Compile a catalogue. Entries keep the order they are given in.
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self> {
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let labels: Vec<String> = spec
                .labels
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(label_regex_fragment)
                .collect();
            if labels.is_empty() {
                return Err(ReconcileError::Catalogue {
                    field: spec.field.to_string(),
                    message: "at least one label spelling is required".to_string(),
                });
            }

            let label_pattern = Regex::new(&format!(
                r"(?is)^\s*(?:{})\s*:(?P<value>.*)$",
                labels.join("|")
            ))
            .map_err(|e| ReconcileError::Catalogue {
                field: spec.field.to_string(),
                message: e.to_string(),
            })?;

            let units: Vec<String> = spec
                .units
                .iter()
                .map(|u| u.trim())
                .filter(|u| !u.is_empty())
                .map(regex::escape)
                .collect();
            let unit_pattern = if units.is_empty() {
                None
            } else {
                Some(
                    Regex::new(&format!(
                        r"(?i)^(?P<number>.*?\d)\s*(?:{})$",
                        units.join("|")
                    ))
                    .map_err(|e| ReconcileError::Catalogue {
                        field: spec.field.to_string(),
                        message: e.to_string(),
                    })?,
                )
            };

            entries.push(CatalogueEntry {
                field: spec.field,
                label_pattern,
                unit_pattern,
            });
        }
        Ok(Self { entries })
    }

    /// Catalogue for string/MPPT electrical measurements.
    pub fn measurement() -> &'static FieldCatalogue {
        &MEASUREMENT_CATALOGUE
    }

    /// Catalogue for punch-list issue items.
    pub fn punch_list() -> &'static FieldCatalogue {
        &PUNCH_LIST_CATALOGUE
    }

    pub(crate) fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    /// Fields in declared order.
    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.entries.iter().map(|e| e.field)
    }

    /// Value fields in declared order, without identity-only fields.
    pub fn value_fields(&self) -> Vec<CanonicalField> {
        let mut out = Vec::new();
        for field in self.fields() {
            if !field.is_identity() && !out.contains(&field) {
                out.push(field);
            }
        }
        out
    }
}

/// Escape a label, letting internal whitespace match any whitespace run.
fn label_regex_fragment(label: &str) -> String {
    label
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn measurement_specs() -> Vec<FieldSpec> {
    use CanonicalField::*;
    vec![
        FieldSpec::new(
            Inverter,
            &["inverter", "inverter model", "inverter id", "inversor", "onduleur", "wechselrichter", "inv"],
            &[],
        ),
        FieldSpec::new(Mppt, &["mppt", "mppt input", "mpp tracker", "tracker", "entrada mppt"], &[]),
        FieldSpec::new(
            StringIndex,
            &["string", "string no", "string no.", "string number", "string nº", "string #", "str", "cadena", "chaîne"],
            &[],
        ),
        FieldSpec::new(
            Voc,
            &[
                "voc",
                "v oc",
                "open circuit voltage",
                "open-circuit voltage",
                "tensão de circuito aberto",
                "tension de circuit ouvert",
                "leerlaufspannung",
            ],
            &["Vdc", "V"],
        ),
        FieldSpec::new(Vmpp, &["vmpp", "vmp", "operating voltage", "mpp voltage"], &["Vdc", "V"]),
        // "current" is also an Impp spelling; this entry must stay ahead of it.
        FieldSpec::new(
            Isc,
            &[
                "isc",
                "i sc",
                "short circuit current",
                "short-circuit current",
                "corrente de curto-circuito",
                "courant de court-circuit",
                "kurzschlussstrom",
                "current",
            ],
            &["mA", "Adc", "A"],
        ),
        FieldSpec::new(
            Impp,
            &["impp", "imp", "operating current", "mpp current", "current"],
            &["mA", "Adc", "A"],
        ),
        FieldSpec::new(
            InsulationResistance,
            &[
                "insulation resistance",
                "insulation",
                "riso",
                "r iso",
                "resistência de isolamento",
                "isolationswiderstand",
            ],
            &["MΩ", "MOhms", "MOhm", "Mohm"],
        ),
        FieldSpec::new(
            Irradiance,
            &["irradiance", "irradiância", "irradiancia", "irradiation", "einstrahlung"],
            &["W/m²", "W/m2", "W/m^2"],
        ),
        FieldSpec::new(
            Temperature,
            &["temperature", "module temperature", "temp", "temperatura", "température"],
            &["°C", "ºC", "C"],
        ),
        FieldSpec::new(
            Notes,
            &["notes", "note", "remarks", "comments", "comment", "observações", "obs"],
            &[],
        ),
    ]
}

fn punch_list_specs() -> Vec<FieldSpec> {
    use CanonicalField::*;
    vec![
        FieldSpec::new(Item, &["item", "item no", "item number", "número", "numero"], &[]),
        FieldSpec::new(
            Description,
            &["description", "descrição", "descripción", "issue", "defect", "problem", "desc"],
            &[],
        ),
        FieldSpec::new(
            Severity,
            &["severity", "priority", "criticality", "gravidade", "prioridade"],
            &[],
        ),
        FieldSpec::new(
            ResponsibleParty,
            &["responsible", "responsible party", "owner", "assigned to", "responsável"],
            &[],
        ),
        FieldSpec::new(
            OpenDate,
            &["open date", "opened", "date opened", "data de abertura", "date"],
            &[],
        ),
        FieldSpec::new(
            CloseDate,
            &["close date", "closed", "date closed", "closing date", "data de fecho", "data de fechamento"],
            &[],
        ),
        FieldSpec::new(Status, &["status", "estado"], &[]),
        FieldSpec::new(
            Notes,
            &["notes", "note", "remarks", "comments", "comment", "observações", "obs"],
            &[],
        ),
    ]
}
