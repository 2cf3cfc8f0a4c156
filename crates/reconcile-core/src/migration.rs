//! Batch migration of legacy punch-list rows into the structured table.
//!
//! # Algorithm (row at a time)
//!
//! 1. **Discover**: read the destination's columns once; the insert is
//!    restricted to the columns that exist.
//! 2. **Select**: load rows still carrying the un-migrated tag. Rows already
//!    marked migrated never reach the driver again, so a rerun after a
//!    partial failure only retries what did not complete.
//! 3. **Plan**: parse the row, check the `(reportId, description)` natural key,
//!    and build the insert and tag-update statements.
//! 4. **Commit**: in execute mode, apply both statements in one transaction.
//!    Dry runs stop after planning and report the statements verbatim.
//!
//! A failing row is recorded with its statement and error and the batch
//! moves on.

use crate::catalog::{CanonicalField, FieldCatalogue};
use crate::config::EngineConfig;
use crate::error::{ReconcileError, Result};
use crate::models::{LegacyEquipmentRow, PunchListIdentity, Record};
use crate::parse::values::leading_integer;
use crate::parse::LegacyRecordBuilder;
use crate::store::{MigrationTarget, PlannedStatement, RowWrite, SqlParam};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// Columns the destination must have for any insert to make sense.
const REQUIRED_COLUMNS: &[&str] = &["report_id", "description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationMode {
    /// Plan every row and report the statements without writing.
    DryRun,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    /// A structured row was inserted and the legacy row marked.
    Migrated,
    /// The natural key already existed; the legacy row was only marked.
    SkippedDuplicate,
    Error,
}

/// Result for one legacy row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMigration {
    pub row_id: i64,
    pub report_id: i64,
    pub description: String,
    pub outcome: RowOutcome,
    /// Insert statement, absent for duplicates.
    pub statement: Option<String>,
    /// Values bound to `statement`, in parameter order.
    pub values: Vec<SqlParam>,
    /// Tag update marking the legacy row.
    pub mark: Option<PlannedStatement>,
    pub error: Option<String>,
}

/// Summary of one driver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub dry_run: bool,
    pub rows_considered: usize,
    pub migrated: usize,
    pub skipped_duplicates: usize,
    pub errors: usize,
    pub rows: Vec<RowMigration>,
}

impl MigrationReport {
    fn new(mode: MigrationMode) -> Self {
        Self {
            dry_run: mode == MigrationMode::DryRun,
            rows_considered: 0,
            migrated: 0,
            skipped_duplicates: 0,
            errors: 0,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: RowMigration) {
        self.rows_considered += 1;
        match row.outcome {
            RowOutcome::Migrated => self.migrated += 1,
            RowOutcome::SkippedDuplicate => self.skipped_duplicates += 1,
            RowOutcome::Error => self.errors += 1,
        }
        self.rows.push(row);
    }
}

/// Drives the punch-list migration against a [`MigrationTarget`].
pub struct MigrationDriver<'a, T: MigrationTarget + ?Sized> {
    target: &'a T,
    config: &'a EngineConfig,
    builder: LegacyRecordBuilder<'a>,
}

impl<'a, T: MigrationTarget + ?Sized> MigrationDriver<'a, T> {
    pub fn new(target: &'a T, config: &'a EngineConfig) -> Self {
        Self::with_catalogue(target, config, FieldCatalogue::punch_list())
    }

    pub fn with_catalogue(target: &'a T, config: &'a EngineConfig, catalogue: &'a FieldCatalogue) -> Self {
        Self {
            target,
            config,
            builder: LegacyRecordBuilder::new(catalogue),
        }
    }

    /// Migrate every pending row, optionally limited to one report.
    ///
    /// Fails only when the destination is unusable as a whole; per-row
    /// failures are reported in the returned [`MigrationReport`].
    pub fn run(&self, mode: MigrationMode, report_id: Option<i64>) -> Result<MigrationReport> {
        let columns = self.target.destination_columns()?;
        if columns.is_empty() {
            return Err(ReconcileError::Schema {
                table: self.config.punch_list_table.clone(),
                message: "table does not exist".to_string(),
            });
        }
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains(**c)) {
            return Err(ReconcileError::Schema {
                table: self.config.punch_list_table.clone(),
                message: format!("required column '{}' is missing", missing),
            });
        }

        let pending = self
            .target
            .pending_legacy_rows(&self.config.punch_list_tag, report_id)?;
        info!(
            "Migrating {} pending '{}' rows ({})",
            pending.len(),
            self.config.punch_list_tag,
            if mode == MigrationMode::DryRun { "dry run" } else { "execute" }
        );

        let mut report = MigrationReport::new(mode);
        // Keys planned earlier in this run, so a dry run sees the duplicates
        // the execute run would.
        let mut planned: BTreeSet<PunchListIdentity> = BTreeSet::new();

        for row in &pending {
            let result = self.migrate_row(row, &columns, mode, &mut planned);
            report.push(result);
        }

        info!(
            "Migration complete: {} migrated, {} duplicates, {} errors",
            report.migrated, report.skipped_duplicates, report.errors
        );
        Ok(report)
    }

    fn migrate_row(
        &self,
        row: &LegacyEquipmentRow,
        columns: &BTreeSet<String>,
        mode: MigrationMode,
        planned: &mut BTreeSet<PunchListIdentity>,
    ) -> RowMigration {
        let record = self.builder.build_punch_item(row);
        let mut result = RowMigration {
            row_id: row.row_id,
            report_id: row.report_id,
            description: record.identity.description.clone(),
            outcome: RowOutcome::Error,
            statement: None,
            values: Vec::new(),
            mark: None,
            error: None,
        };

        // A blank row keys as (reportId, "") and migrates like any other.
        let duplicate = match self.is_duplicate(&record.identity, planned) {
            Ok(duplicate) => duplicate,
            Err(e) => return self.fail(result, e),
        };

        let write = RowWrite {
            insert: (!duplicate).then(|| self.plan_insert(columns, row, &record)),
            mark: self.plan_mark(row),
        };
        if let Some(insert) = &write.insert {
            result.statement = Some(insert.sql.clone());
            result.values = insert.values.clone();
        }
        result.mark = Some(write.mark.clone());

        if mode == MigrationMode::Execute {
            if let Err(e) = self.target.commit_row(&write) {
                return self.fail(result, e);
            }
        }

        planned.insert(record.identity);
        result.outcome = if duplicate {
            debug!("Row {}: '{}' already migrated, marking only", row.row_id, result.description);
            RowOutcome::SkippedDuplicate
        } else {
            debug!("Row {}: migrated '{}'", row.row_id, result.description);
            RowOutcome::Migrated
        };
        result
    }

    fn is_duplicate(&self, key: &PunchListIdentity, planned: &BTreeSet<PunchListIdentity>) -> Result<bool> {
        if planned.contains(key) {
            return Ok(true);
        }
        self.target.natural_key_exists(key.report_id, &key.description)
    }

    fn fail(&self, mut result: RowMigration, e: ReconcileError) -> RowMigration {
        if e.is_row_local() {
            warn!("Row {} failed: {}", result.row_id, e);
        } else {
            error!("Row {} failed: {}", result.row_id, e);
        }
        result.outcome = RowOutcome::Error;
        result.error = Some(e.to_string());
        result
    }

    /// Insert restricted to the destination's columns, in a fixed column order.
    pub fn plan_insert(
        &self,
        columns: &BTreeSet<String>,
        row: &LegacyEquipmentRow,
        record: &Record<PunchListIdentity>,
    ) -> PlannedStatement {
        let text = |field: CanonicalField| record.value(field).map(|v| SqlParam::Text(v.to_string()));
        let status = text(CanonicalField::Status).unwrap_or_else(|| {
            let derived = if record.value(CanonicalField::CloseDate).is_some() {
                "closed"
            } else {
                "open"
            };
            SqlParam::Text(derived.to_string())
        });
        let item_number = record.value(CanonicalField::Item).map(|v| match leading_integer(v) {
            Some(n) => SqlParam::Integer(i64::from(n)),
            None => SqlParam::Text(v.to_string()),
        });

        let candidates: [(&str, Option<SqlParam>); 10] = [
            ("report_id", Some(SqlParam::Integer(record.identity.report_id))),
            ("description", Some(SqlParam::Text(record.identity.description.clone()))),
            ("severity", text(CanonicalField::Severity)),
            ("responsible_party", text(CanonicalField::ResponsibleParty)),
            ("open_date", text(CanonicalField::OpenDate)),
            ("close_date", text(CanonicalField::CloseDate)),
            ("notes", text(CanonicalField::Notes)),
            ("status", Some(status)),
            ("item_number", item_number),
            ("legacy_equipment_id", Some(SqlParam::Integer(row.row_id))),
        ];

        let (names, values): (Vec<&str>, Vec<SqlParam>) = candidates
            .into_iter()
            .filter(|(column, _)| columns.contains(*column))
            .filter_map(|(column, value)| value.map(|v| (column, v)))
            .unzip();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();

        PlannedStatement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.config.punch_list_table,
                names.join(", "),
                placeholders.join(", ")
            ),
            values,
        }
    }

    /// Tag update; only matches while the row still carries the un-migrated tag.
    fn plan_mark(&self, row: &LegacyEquipmentRow) -> PlannedStatement {
        PlannedStatement {
            sql: format!(
                "UPDATE {} SET equipment_type = ?1 WHERE id = ?2 AND equipment_type = ?3",
                self.config.equipment_table
            ),
            values: vec![
                SqlParam::Text(self.config.migrated_punch_list_tag()),
                SqlParam::Integer(row.row_id),
                SqlParam::Text(self.config.punch_list_tag.clone()),
            ],
        }
    }
}
