//! Maps raw `Label: value` segments onto canonical fields.

use super::values::{normalize_date, normalize_decimal};
use crate::catalog::{CanonicalField, FieldCatalogue, ValueKind};
use tracing::debug;

/// A segment whose label was recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSegment {
    pub field: CanonicalField,
    pub value: String,
}

/// Label normalizer bound to one catalogue.
#[derive(Debug, Clone, Copy)]
pub struct LabelNormalizer<'c> {
    catalogue: &'c FieldCatalogue,
}

impl<'c> LabelNormalizer<'c> {
    pub fn new(catalogue: &'c FieldCatalogue) -> Self {
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &'c FieldCatalogue {
        self.catalogue
    }

    /// Normalize one segment.
    ///
    /// Fields are tried in catalogue order and the first label match wins.
    /// Unrecognized segments return `None` and are dropped by callers.
    pub fn normalize(&self, raw: &str) -> Option<NormalizedSegment> {
        for entry in self.catalogue.entries() {
            let Some(caps) = entry.label_pattern.captures(raw) else {
                continue;
            };
            let value = caps.name("value").map_or("", |m| m.as_str()).trim();

            let value = match entry.field.kind() {
                ValueKind::Numeric => {
                    let stripped = entry
                        .unit_pattern
                        .as_ref()
                        .and_then(|p| p.captures(value))
                        .and_then(|c| c.name("number"))
                        .map_or(value, |m| m.as_str())
                        .trim();
                    normalize_decimal(stripped)
                }
                ValueKind::Date => normalize_date(value),
                ValueKind::Text => value.to_string(),
            };

            return Some(NormalizedSegment {
                field: entry.field,
                value,
            });
        }

        debug!("Dropping unrecognized segment: {:?}", raw);
        None
    }
}
