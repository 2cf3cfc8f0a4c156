//! SQLite adapter for the commissioning database.

use super::traits::{MigrationTarget, ReportSource, RowWrite};
use crate::catalog::{CanonicalField, FieldCatalogue};
use crate::config::EngineConfig;
use crate::error::{ReconcileError, Result};
use crate::models::{
    CanonicalEntity, LegacyEquipmentRow, StructuredMeasurementRow, StructuredPunchItemRow,
};
use crate::parse::values::render_sql_value;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// SQLite-backed store.
///
/// Thread-safe via internal mutex on the connection. Optional columns are
/// discovered per query, so older and newer schemas both load.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    config: EngineConfig,
}

impl SqliteStore {
    /// Open the database at `db_path` with default table names.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(db_path, EngineConfig::default())
    }

    /// Open the database with deployment-specific table names and tags.
    pub fn with_config(db_path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path).map_err(|e| ReconcileError::Database {
            message: format!("Failed to open database {}: {}", db_path.display(), e),
            source: Some(e),
        })?;
        Self::configure_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA busy_timeout=30000;
            PRAGMA foreign_keys=ON;
            ",
        )?;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the reference tables if they do not exist.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        let c = &self.config;
        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {equipment} (
                id INTEGER PRIMARY KEY,
                report_id INTEGER NOT NULL,
                equipment_type TEXT NOT NULL,
                characteristics TEXT,
                created_index INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_{equipment}_report_type
                ON {equipment}(report_id, equipment_type);

            CREATE TABLE IF NOT EXISTS {inverters} (
                id INTEGER PRIMARY KEY,
                report_id INTEGER NOT NULL,
                model_identifier TEXT
            );

            CREATE TABLE IF NOT EXISTS {measurements} (
                id INTEGER PRIMARY KEY,
                report_id INTEGER NOT NULL,
                inverter_index INTEGER NOT NULL,
                mppt_index INTEGER NOT NULL,
                string_index INTEGER NOT NULL,
                voc REAL,
                vmpp REAL,
                isc REAL,
                impp REAL,
                insulation_resistance REAL,
                irradiance REAL,
                temperature REAL,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS {punch} (
                id INTEGER PRIMARY KEY,
                report_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                severity TEXT,
                responsible_party TEXT,
                open_date TEXT,
                close_date TEXT,
                status TEXT,
                notes TEXT,
                legacy_equipment_id INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_{punch}_natural_key
                ON {punch}(report_id, description);
            ",
            equipment = c.equipment_table,
            inverters = c.inverters_table,
            measurements = c.measurements_table,
            punch = c.punch_list_table,
        ))?;
        Ok(())
    }

    /// Run arbitrary SQL against the store, e.g. fixtures or site-specific setup.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// Run a query returning one integer, e.g. a count.
    pub fn query_count(&self, sql: &str) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    }

    /// Columns of a table; empty if the table does not exist.
    pub fn table_columns(&self, table: &str) -> Result<BTreeSet<String>> {
        let conn = self.lock()?;
        Self::columns_of(&conn, table)
    }

    fn columns_of(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(columns)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ReconcileError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    fn legacy_select(&self, columns: &BTreeSet<String>) -> String {
        format!(
            "SELECT id, report_id, equipment_type, characteristics, {} FROM {}",
            optional_column(columns, "created_index"),
            self.config.equipment_table
        )
    }

    fn row_to_legacy(row: &Row) -> rusqlite::Result<LegacyEquipmentRow> {
        Ok(LegacyEquipmentRow {
            row_id: row.get(0)?,
            report_id: row.get(1)?,
            equipment_type: row.get(2)?,
            characteristics: row.get(3)?,
            created_index: row.get(4)?,
        })
    }

    /// Read the value columns that exist, in catalogue order.
    fn read_values(
        row: &Row,
        first_index: usize,
        fields: &[CanonicalField],
    ) -> rusqlite::Result<BTreeMap<CanonicalField, Option<String>>> {
        let mut values = BTreeMap::new();
        for (offset, field) in fields.iter().enumerate() {
            let value: Value = row.get(first_index + offset)?;
            values.insert(*field, render_sql_value(&value));
        }
        Ok(values)
    }

    fn present_fields(columns: &BTreeSet<String>, catalogue: &FieldCatalogue) -> Vec<CanonicalField> {
        catalogue
            .value_fields()
            .into_iter()
            .filter(|f| columns.contains(f.column()))
            .collect()
    }
}

fn optional_column<'a>(columns: &BTreeSet<String>, name: &'a str) -> &'a str {
    if columns.contains(name) {
        name
    } else {
        "NULL"
    }
}

/// Index columns may be stored as INTEGER, REAL or TEXT depending on the deployment.
fn value_as_index(value: &Value) -> Option<u32> {
    match value {
        Value::Integer(i) => u32::try_from(*i).ok(),
        Value::Real(f) if *f >= 0.0 && f.fract() == 0.0 => u32::try_from(*f as i64).ok(),
        Value::Text(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

impl ReportSource for SqliteStore {
    fn legacy_rows(&self, report_id: i64, equipment_type: &str) -> Result<Vec<LegacyEquipmentRow>> {
        let conn = self.lock()?;
        let columns = Self::columns_of(&conn, &self.config.equipment_table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE report_id = ?1 AND equipment_type = ?2 ORDER BY {} , id",
            self.legacy_select(&columns),
            if columns.contains("created_index") {
                "COALESCE(created_index, id)"
            } else {
                "id"
            }
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![report_id, equipment_type], Self::row_to_legacy)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Loaded {} legacy '{}' rows for report {}", rows.len(), equipment_type, report_id);
        Ok(rows)
    }

    fn inverters(&self, report_id: i64) -> Result<Vec<CanonicalEntity>> {
        let conn = self.lock()?;
        let columns = Self::columns_of(&conn, &self.config.inverters_table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, {} FROM {} WHERE report_id = ?1 ORDER BY id",
            optional_column(&columns, "model_identifier"),
            self.config.inverters_table
        );
        let mut stmt = conn.prepare(&sql)?;
        let entities = stmt
            .query_map(params![report_id], |row| {
                Ok(CanonicalEntity {
                    entity_id: row.get(0)?,
                    key: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    fn structured_measurements(&self, report_id: i64) -> Result<Vec<StructuredMeasurementRow>> {
        let conn = self.lock()?;
        let table = &self.config.measurements_table;
        let columns = Self::columns_of(&conn, table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let fields = Self::present_fields(&columns, FieldCatalogue::measurement());
        let mut select = vec!["id", "report_id", "inverter_index", "mppt_index", "string_index"];
        select.extend(fields.iter().map(|f| f.column()));
        let sql = format!(
            "SELECT {} FROM {} WHERE report_id = ?1 ORDER BY id",
            select.join(", "),
            table
        );

        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params![report_id], |row| {
                let identity: [Value; 3] = [row.get(2)?, row.get(3)?, row.get(4)?];
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    identity,
                    Self::read_values(row, 5, &fields)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (row_id, report_id, identity, values) in raw {
            let [inverter, mppt, string] = identity.map(|v| value_as_index(&v));
            match (inverter, mppt, string) {
                (Some(inverter), Some(mppt), Some(string)) => rows.push(StructuredMeasurementRow {
                    row_id,
                    report_id,
                    inverter_index: inverter,
                    mppt_index: mppt,
                    string_index: string,
                    values,
                }),
                _ => warn!(
                    "Skipping structured measurement {}: identity columns are not non-negative integers",
                    row_id
                ),
            }
        }
        Ok(rows)
    }

    fn structured_punch_items(&self, report_id: i64) -> Result<Vec<StructuredPunchItemRow>> {
        let conn = self.lock()?;
        let table = &self.config.punch_list_table;
        let columns = Self::columns_of(&conn, table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let fields: Vec<CanonicalField> = Self::present_fields(&columns, FieldCatalogue::punch_list())
            .into_iter()
            .filter(|f| *f != CanonicalField::Description)
            .collect();
        let mut select = vec!["id", "report_id", "description"];
        select.extend(fields.iter().map(|f| f.column()));
        let sql = format!(
            "SELECT {} FROM {} WHERE report_id = ?1 ORDER BY id",
            select.join(", "),
            table
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![report_id], |row| {
                let description: Option<String> = row.get(2)?;
                Ok(StructuredPunchItemRow {
                    row_id: row.get(0)?,
                    report_id: row.get(1)?,
                    description: description.unwrap_or_default(),
                    values: Self::read_values(row, 3, &fields)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl MigrationTarget for SqliteStore {
    fn pending_legacy_rows(
        &self,
        equipment_type: &str,
        report_id: Option<i64>,
    ) -> Result<Vec<LegacyEquipmentRow>> {
        let conn = self.lock()?;
        let columns = Self::columns_of(&conn, &self.config.equipment_table)?;
        if columns.is_empty() {
            return Err(ReconcileError::Schema {
                table: self.config.equipment_table.clone(),
                message: "table does not exist".to_string(),
            });
        }

        let select = self.legacy_select(&columns);
        let rows = match report_id {
            Some(report_id) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE equipment_type = ?1 AND report_id = ?2 ORDER BY id",
                    select
                ))?;
                let rows = stmt
                    .query_map(params![equipment_type, report_id], Self::row_to_legacy)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE equipment_type = ?1 ORDER BY id", select))?;
                let rows = stmt
                    .query_map(params![equipment_type], Self::row_to_legacy)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    fn destination_columns(&self) -> Result<BTreeSet<String>> {
        self.table_columns(&self.config.punch_list_table)
    }

    fn natural_key_exists(&self, report_id: i64, description: &str) -> Result<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE report_id = ?1 AND TRIM(description) = ?2)",
                self.config.punch_list_table
            ),
            params![report_id, description],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn commit_row(&self, write: &RowWrite) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some(insert) = &write.insert {
            tx.execute(&insert.sql, params_from_iter(insert.values.iter()))?;
        }

        let marked = tx.execute(&write.mark.sql, params_from_iter(write.mark.values.iter()))?;
        if marked != 1 {
            // Dropping the transaction rolls the insert back.
            return Err(ReconcileError::Other(format!(
                "legacy row was not pending any more ({} rows matched the tag update)",
                marked
            )));
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("commissioning.sqlite")).unwrap();
        store.ensure_schema().unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_schema_is_idempotent() {
        let (_temp, store) = create_test_store();
        store.ensure_schema().unwrap();
        assert!(store.table_columns("equipment").unwrap().contains("characteristics"));
    }

    #[test]
    fn test_missing_table_has_no_columns() {
        let store = SqliteStore::open_in_memory(EngineConfig::default()).unwrap();
        assert!(store.table_columns("punch_list_items").unwrap().is_empty());
        assert!(store.structured_measurements(1).unwrap().is_empty());
        assert!(store.legacy_rows(1, "String Measurement").unwrap().is_empty());
    }

    #[test]
    fn test_legacy_rows_filter_exact_tag_and_order() {
        let (_temp, store) = create_test_store();
        store
            .execute_batch(
                "INSERT INTO equipment (id, report_id, equipment_type, characteristics, created_index) VALUES
                    (1, 5, 'String Measurement', 'Voc: 1V', 2),
                    (2, 5, 'String Measurement', 'Voc: 2V', 1),
                    (3, 5, 'String Measurement (migrated)', 'Voc: 3V', 0),
                    (4, 6, 'String Measurement', 'Voc: 4V', 0);",
            )
            .unwrap();

        let rows = store.legacy_rows(5, "String Measurement").unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.row_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_loosely_typed_measurement_columns() {
        let (_temp, store) = create_test_store();
        store
            .execute_batch(
                "INSERT INTO string_measurements (id, report_id, inverter_index, mppt_index, string_index, voc, isc)
                 VALUES (1, 5, 0, '2', 3.0, 600.0, 0.0),
                        (2, 5, -1, 1, 1, '610', NULL);",
            )
            .unwrap();

        let rows = store.structured_measurements(5).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!((row.inverter_index, row.mppt_index, row.string_index), (0, 2, 3));
        assert_eq!(row.values[&CanonicalField::Voc].as_deref(), Some("600"));
        assert_eq!(row.values[&CanonicalField::Isc].as_deref(), Some("0"));
        assert_eq!(row.values[&CanonicalField::Notes], None);
    }

    #[test]
    fn test_reduced_measurement_schema() {
        let store = SqliteStore::open_in_memory(EngineConfig::default()).unwrap();
        store
            .execute_batch(
                "CREATE TABLE string_measurements (
                    id INTEGER PRIMARY KEY, report_id INTEGER, inverter_index INTEGER,
                    mppt_index INTEGER, string_index INTEGER, voc REAL);
                 INSERT INTO string_measurements VALUES (1, 9, 0, 1, 1, 598.5);",
            )
            .unwrap();

        let rows = store.structured_measurements(9).unwrap();
        assert_eq!(rows[0].values.len(), 1);
        assert_eq!(rows[0].values[&CanonicalField::Voc].as_deref(), Some("598.5"));
    }

    #[test]
    fn test_commit_row_rolls_back_when_row_is_no_longer_pending() {
        use crate::store::{PlannedStatement, SqlParam};

        let (_temp, store) = create_test_store();
        store
            .execute_batch(
                "INSERT INTO equipment (id, report_id, equipment_type, characteristics)
                 VALUES (1, 5, 'Punch List Item (migrated)', 'Description: x');",
            )
            .unwrap();

        let write = RowWrite {
            insert: Some(PlannedStatement {
                sql: "INSERT INTO punch_list_items (report_id, description) VALUES (?1, ?2)".into(),
                values: vec![SqlParam::Integer(5), SqlParam::Text("x".into())],
            }),
            mark: PlannedStatement {
                sql: "UPDATE equipment SET equipment_type = ?1 WHERE id = ?2 AND equipment_type = ?3".into(),
                values: vec![
                    SqlParam::Text("Punch List Item (migrated)".into()),
                    SqlParam::Integer(1),
                    SqlParam::Text("Punch List Item".into()),
                ],
            },
        };

        assert!(store.commit_row(&write).is_err());
        assert_eq!(store.query_count("SELECT COUNT(*) FROM punch_list_items").unwrap(), 0);
    }
}
