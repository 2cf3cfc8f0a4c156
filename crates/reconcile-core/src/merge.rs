//! Field-level merge of legacy-derived (baseline) and structured (overlay) records.
//!
//! # Algorithm
//!
//! 1. **Fold baseline**: legacy records are keyed by identity; records sharing
//!    an identity fold in input order, later values replacing earlier ones.
//! 2. **Apply overlay**: for each structured record,
//!    - no baseline entry: insert it as-is,
//!    - otherwise merge field by field with [`decide_field`].
//!
//! The output map is keyed by identity, so one identity yields one record.
//! Inputs are only read, never written, which makes the merge idempotent.
//!
//! # Override policy
//!
//! The overlay wins unless its value is empty, or it is a numeric zero
//! replacing a non-numeric legacy value. Some deployments write `0` for
//! "not measured", and that must not erase a descriptive legacy entry.

use crate::catalog::CanonicalField;
use crate::models::Record;
use crate::parse::values::{is_numeric, parse_number};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Decision for one field of an identity present in both sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDecision {
    KeepBaseline,
    /// Overlay is a zero reading over descriptive text.
    KeepBaselineOverZero,
    TakeOverlay,
}

/// Counters describing one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    /// Identities only the legacy side knew.
    pub baseline_only: usize,
    /// Identities only the structured side knew.
    pub overlay_only: usize,
    /// Identities present on both sides.
    pub merged: usize,
    pub fields_overwritten: usize,
    pub zero_overrides_rejected: usize,
}

/// Merged records keyed by identity, plus counters.
#[derive(Debug, Clone)]
pub struct MergeOutcome<I> {
    pub records: BTreeMap<I, Record<I>>,
    pub stats: MergeStats,
}

/// Decide whether the overlay value replaces the baseline value.
pub fn decide_field(existing: Option<&str>, incoming: Option<&str>) -> FieldDecision {
    let incoming = match incoming.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return FieldDecision::KeepBaseline,
    };

    if let Some(existing) = existing.map(str::trim).filter(|v| !v.is_empty()) {
        if !is_numeric(existing) && parse_number(incoming) == Some(0.0) {
            return FieldDecision::KeepBaselineOverZero;
        }
    }

    FieldDecision::TakeOverlay
}

/// Key baseline records by identity, folding duplicates in order.
pub fn fold_baseline<I: Ord + Clone>(baseline: &[Record<I>]) -> BTreeMap<I, Record<I>> {
    let mut folded: BTreeMap<I, Record<I>> = BTreeMap::new();
    for record in baseline {
        folded
            .entry(record.identity.clone())
            .and_modify(|existing| {
                existing
                    .fields
                    .extend(record.fields.iter().map(|(f, v)| (*f, v.clone())));
            })
            .or_insert_with(|| record.clone());
    }
    folded
}

/// Merge baseline and overlay records for one report.
pub fn merge<I: Ord + Clone>(baseline: &[Record<I>], overlay: &[Record<I>]) -> MergeOutcome<I> {
    let mut records = fold_baseline(baseline);
    let mut stats = MergeStats::default();
    let baseline_ids: BTreeSet<I> = records.keys().cloned().collect();
    let mut matched: BTreeSet<I> = BTreeSet::new();

    for incoming in overlay {
        match records.get_mut(&incoming.identity) {
            None => {
                records.insert(incoming.identity.clone(), incoming.clone());
                stats.overlay_only += 1;
            }
            Some(existing) => {
                if baseline_ids.contains(&incoming.identity) && matched.insert(incoming.identity.clone()) {
                    stats.merged += 1;
                }
                merge_fields(existing, incoming, &mut stats);
            }
        }
    }

    stats.baseline_only = baseline_ids.len() - matched.len();

    debug!(
        "Merge: {} baseline-only, {} overlay-only, {} merged, {} zero overrides rejected",
        stats.baseline_only, stats.overlay_only, stats.merged, stats.zero_overrides_rejected
    );

    MergeOutcome { records, stats }
}

fn merge_fields<I>(existing: &mut Record<I>, incoming: &Record<I>, stats: &mut MergeStats) {
    for (field, value) in &incoming.fields {
        let current = existing.fields.get(field).map(String::as_str);
        match decide_field(current, Some(value)) {
            FieldDecision::TakeOverlay => {
                existing.fields.insert(*field, value.trim().to_string());
                stats.fields_overwritten += 1;
            }
            FieldDecision::KeepBaselineOverZero => {
                debug!(
                    "Keeping legacy {} {:?} over overlay zero",
                    field,
                    current.unwrap_or_default()
                );
                stats.zero_overrides_rejected += 1;
            }
            FieldDecision::KeepBaseline => {}
        }
    }
}

/// Fields of a merged record in the given order, absent ones rendered empty.
pub fn render_fields<I>(record: &Record<I>, fields: &[CanonicalField]) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|f| {
            (
                f.key().to_string(),
                record.fields.get(f).cloned().unwrap_or_default(),
            )
        })
        .collect()
}
