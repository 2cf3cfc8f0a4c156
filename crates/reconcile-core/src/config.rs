//! Centralized configuration for the reconciliation engine.
//!
//! Constant tables hold the historical defaults. `EngineConfig` lets a
//! deployment override tags and table names from a JSON file.

use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Equipment-type tags that select legacy rows.
pub struct LegacyTagConfig;

impl LegacyTagConfig {
    pub const MEASUREMENT_TAG: &'static str = "String Measurement";
    pub const PUNCH_LIST_TAG: &'static str = "Punch List Item";
    pub const MIGRATED_SUFFIX: &'static str = " (migrated)";
}

/// Table names in the relational store.
pub struct SchemaConfig;

impl SchemaConfig {
    pub const EQUIPMENT_TABLE: &'static str = "equipment";
    pub const INVERTERS_TABLE: &'static str = "inverters";
    pub const MEASUREMENTS_TABLE: &'static str = "string_measurements";
    pub const PUNCH_LIST_TABLE: &'static str = "punch_list_items";
}

/// Defaults substituted when legacy identity fields are missing.
pub struct IdentityConfig;

impl IdentityConfig {
    pub const DEFAULT_MPPT_INDEX: u32 = 1;
    pub const DEFAULT_STRING_INDEX: u32 = 1;
    pub const FALLBACK_INVERTER_POSITION: usize = 0;
}

/// Per-deployment overrides, loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub measurement_tag: String,
    pub punch_list_tag: String,
    pub migrated_suffix: String,
    pub equipment_table: String,
    pub inverters_table: String,
    pub measurements_table: String,
    pub punch_list_table: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            measurement_tag: LegacyTagConfig::MEASUREMENT_TAG.to_string(),
            punch_list_tag: LegacyTagConfig::PUNCH_LIST_TAG.to_string(),
            migrated_suffix: LegacyTagConfig::MIGRATED_SUFFIX.to_string(),
            equipment_table: SchemaConfig::EQUIPMENT_TABLE.to_string(),
            inverters_table: SchemaConfig::INVERTERS_TABLE.to_string(),
            measurements_table: SchemaConfig::MEASUREMENTS_TABLE.to_string(),
            punch_list_table: SchemaConfig::PUNCH_LIST_TABLE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load a config file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ReconcileError::io_with_path(e, path))?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Tag written to a punch-list row once it has been migrated.
    pub fn migrated_punch_list_tag(&self) -> String {
        format!("{}{}", self.punch_list_tag, self.migrated_suffix)
    }

    pub fn validate(&self) -> Result<()> {
        if self.punch_list_tag.trim().is_empty() || self.measurement_tag.trim().is_empty() {
            return Err(ReconcileError::Config {
                message: "legacy tags must not be empty".to_string(),
            });
        }
        // An empty suffix would let the driver select its own output again.
        if self.migrated_suffix.is_empty() {
            return Err(ReconcileError::Config {
                message: "migrated suffix must not be empty".to_string(),
            });
        }
        for table in [
            &self.equipment_table,
            &self.inverters_table,
            &self.measurements_table,
            &self.punch_list_table,
        ] {
            if !is_identifier(table) {
                return Err(ReconcileError::Config {
                    message: format!("invalid table name: {:?}", table),
                });
            }
        }
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers are accepted.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_migrated_tag() {
        let config = EngineConfig::default();
        assert_eq!(config.migrated_punch_list_tag(), "Punch List Item (migrated)");
        assert_ne!(config.migrated_punch_list_tag(), config.punch_list_tag);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("engine.json");
        std::fs::write(&path, r#"{"punchListTag": "Snag"}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.punch_list_tag, "Snag");
        assert_eq!(config.equipment_table, SchemaConfig::EQUIPMENT_TABLE);
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let config = EngineConfig {
            punch_list_table: "items; DROP TABLE equipment".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReconcileError::Config { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_suffix() {
        let config = EngineConfig {
            migrated_suffix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
