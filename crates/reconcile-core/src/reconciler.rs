//! Read-and-merge entry points for one report.
//!
//! Each call reads fresh rows from the source, builds its own lookups and
//! returns ordered records. Store read failures are logged and recorded in
//! [`Diagnostics`]; the affected side is treated as empty so a report still
//! renders.

use crate::assemble::{self, MeasurementOutput, PunchListOutput};
use crate::catalog::FieldCatalogue;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::identity::{IdentityResolver, ResolutionOutcome};
use crate::loader;
use crate::merge::{merge, MergeStats};
use crate::models::{LegacyEquipmentRow, MeasurementIdentity, Record};
use crate::parse::LegacyRecordBuilder;
use crate::store::ReportSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// A legacy inverter reference that matched no canonical inverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedReference {
    pub row_id: i64,
    /// The reference as written, `None` when the row named no inverter.
    pub reference: Option<String>,
}

/// Observability data gathered while reconciling one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub legacy_rows: usize,
    pub structured_rows: usize,
    pub unresolved_references: Vec<UnresolvedReference>,
    /// Read errors that were absorbed instead of failing the render.
    pub source_errors: Vec<String>,
    pub merge: MergeStats,
}

/// Ordered records for one report plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation<T> {
    pub report_id: i64,
    pub records: Vec<T>,
    pub diagnostics: Diagnostics,
}

/// Reconciles legacy and structured rows read from a [`ReportSource`].
pub struct Reconciler<'s, S: ReportSource + ?Sized> {
    source: &'s S,
    config: EngineConfig,
    measurement_catalogue: &'s FieldCatalogue,
    punch_list_catalogue: &'s FieldCatalogue,
}

impl<'s, S: ReportSource + ?Sized> Reconciler<'s, S> {
    /// Reconciler using the built-in label catalogues.
    pub fn new(source: &'s S, config: EngineConfig) -> Self {
        Self {
            source,
            config,
            measurement_catalogue: FieldCatalogue::measurement(),
            punch_list_catalogue: FieldCatalogue::punch_list(),
        }
    }

    /// Reconciler using deployment-specific catalogues.
    pub fn with_catalogues(
        source: &'s S,
        config: EngineConfig,
        measurement: &'s FieldCatalogue,
        punch_list: &'s FieldCatalogue,
    ) -> Self {
        Self {
            source,
            config,
            measurement_catalogue: measurement,
            punch_list_catalogue: punch_list,
        }
    }

    /// Merged string measurements, sorted by (inverter, MPPT, string).
    pub fn reconcile_measurements(&self, report_id: i64) -> Reconciliation<MeasurementOutput> {
        let mut diagnostics = Diagnostics::default();

        let mut legacy = absorb(
            self.source.legacy_rows(report_id, &self.config.measurement_tag),
            "legacy measurement rows",
            &mut diagnostics,
        );
        let inverters = absorb(self.source.inverters(report_id), "inverters", &mut diagnostics);
        let structured = absorb(
            self.source.structured_measurements(report_id),
            "structured measurements",
            &mut diagnostics,
        );
        sort_by_creation(&mut legacy);
        diagnostics.legacy_rows = legacy.len();
        diagnostics.structured_rows = structured.len();

        let builder = LegacyRecordBuilder::new(self.measurement_catalogue);
        let resolver = IdentityResolver::new(&inverters);

        let baseline: Vec<Record<MeasurementIdentity>> = legacy
            .iter()
            .map(|row| {
                let parsed = builder.build_measurement(row);
                let reference = parsed.provisional.inverter_ref;
                let resolution = resolver.resolve(reference.as_deref());
                match resolution.outcome {
                    ResolutionOutcome::Unresolved => {
                        warn!(
                            "Report {}: legacy row {} references unknown inverter {:?} ({} on report); assuming position {}",
                            report_id,
                            row.row_id,
                            reference.as_deref().unwrap_or_default(),
                            resolver.entity_count(),
                            resolution.position
                        );
                        diagnostics.unresolved_references.push(UnresolvedReference {
                            row_id: row.row_id,
                            reference: reference.clone(),
                        });
                    }
                    ResolutionOutcome::SingleEntityFallback => {
                        debug!(
                            "Report {}: legacy row {} assigned to the only inverter",
                            report_id, row.row_id
                        );
                    }
                    ResolutionOutcome::Matched => {}
                }
                Record::with_fields(
                    MeasurementIdentity::new(
                        resolution.position,
                        parsed.provisional.mppt_index,
                        parsed.provisional.string_index,
                    ),
                    parsed.fields,
                )
            })
            .collect();

        let overlay = loader::measurement_records(&structured);
        let outcome = merge(&baseline, &overlay);
        diagnostics.merge = outcome.stats;

        let records = assemble::measurements(outcome.records, self.measurement_catalogue);
        info!(
            "Report {}: {} string measurements ({} legacy, {} structured)",
            report_id,
            records.len(),
            diagnostics.legacy_rows,
            diagnostics.structured_rows
        );

        Reconciliation {
            report_id,
            records,
            diagnostics,
        }
    }

    /// Merged punch-list items, sorted by description and numbered from 1.
    pub fn reconcile_punch_list(&self, report_id: i64) -> Reconciliation<PunchListOutput> {
        let mut diagnostics = Diagnostics::default();

        let mut legacy = absorb(
            self.source.legacy_rows(report_id, &self.config.punch_list_tag),
            "legacy punch-list rows",
            &mut diagnostics,
        );
        let structured = absorb(
            self.source.structured_punch_items(report_id),
            "structured punch-list items",
            &mut diagnostics,
        );
        sort_by_creation(&mut legacy);
        diagnostics.legacy_rows = legacy.len();
        diagnostics.structured_rows = structured.len();

        let builder = LegacyRecordBuilder::new(self.punch_list_catalogue);
        let baseline: Vec<_> = legacy
            .iter()
            .map(|row| builder.build_punch_item(row))
            .collect();
        let overlay = loader::punch_item_records(&structured);

        let outcome = merge(&baseline, &overlay);
        diagnostics.merge = outcome.stats;

        let records = assemble::punch_items(outcome.records, self.punch_list_catalogue);
        info!(
            "Report {}: {} punch-list items ({} legacy, {} structured)",
            report_id,
            records.len(),
            diagnostics.legacy_rows,
            diagnostics.structured_rows
        );

        Reconciliation {
            report_id,
            records,
            diagnostics,
        }
    }
}

/// Creation order, with the row id as tie-break and stand-in for a missing hint.
fn sort_by_creation(rows: &mut [LegacyEquipmentRow]) {
    rows.sort_by_key(|row| (row.created_index.unwrap_or(row.row_id), row.row_id));
}

fn absorb<T>(result: Result<Vec<T>>, what: &str, diagnostics: &mut Diagnostics) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to read {}: {}", what, e);
            diagnostics.source_errors.push(format!("{}: {}", what, e));
            Vec::new()
        }
    }
}
