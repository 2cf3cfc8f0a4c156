//! Resolves free-text inverter references to canonical positions.
//!
//! The canonical list of entities for a report (inverters, in creation order)
//! is the source of truth for positional indices. Legacy rows refer to an
//! inverter by its model identifier; structured rows by position.

use crate::config::IdentityConfig;
use crate::models::CanonicalEntity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// The reference matched a canonical entity's key.
    Matched,
    /// No match, but the report has exactly one entity.
    SingleEntityFallback,
    /// No match and no single-entity fallback; position 0 was assumed.
    Unresolved,
}

/// A resolved zero-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub position: usize,
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    pub fn is_unresolved(&self) -> bool {
        self.outcome == ResolutionOutcome::Unresolved
    }
}

/// Lookup from entity key to canonical position, built once per report.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    positions: HashMap<String, usize>,
    entity_count: usize,
}

impl IdentityResolver {
    /// Build the lookup. Keys compare trimmed and case-insensitively; a key
    /// shared by several entities resolves to the first of them.
    pub fn new(entities: &[CanonicalEntity]) -> Self {
        let mut positions = HashMap::with_capacity(entities.len());
        for (position, entity) in entities.iter().enumerate() {
            if let Some(key) = entity.key.as_deref().map(lookup_key) {
                if !key.is_empty() {
                    positions.entry(key).or_insert(position);
                }
            }
        }
        Self {
            positions,
            entity_count: entities.len(),
        }
    }

    /// Resolve a reference. Never fails: unknown references fall back to
    /// position 0 and report how they got there.
    ///
    /// The fallback to 0 for unmatched references on multi-inverter reports is
    /// a historical heuristic, not a verified mapping.
    pub fn resolve(&self, reference: Option<&str>) -> Resolution {
        if let Some(position) = reference
            .map(lookup_key)
            .and_then(|key| self.positions.get(&key).copied())
        {
            return Resolution {
                position,
                outcome: ResolutionOutcome::Matched,
            };
        }

        if self.entity_count == 1 {
            return Resolution {
                position: 0,
                outcome: ResolutionOutcome::SingleEntityFallback,
            };
        }

        Resolution {
            position: IdentityConfig::FALLBACK_INVERTER_POSITION,
            outcome: ResolutionOutcome::Unresolved,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }
}

fn lookup_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}
