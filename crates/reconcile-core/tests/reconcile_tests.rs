//! Integration tests for the read-and-merge path against a real SQLite file.

use reconcile_core::{EngineConfig, MeasurementIdentity, Reconciler, SqliteStore};
use tempfile::TempDir;

/// Create a store with the reference schema in a temporary directory.
fn create_test_store() -> (TempDir, SqliteStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteStore::open(temp_dir.path().join("commissioning.sqlite")).unwrap();
    store.ensure_schema().unwrap();
    (temp_dir, store)
}

#[test]
fn test_legacy_row_without_overlay() {
    let (_temp, store) = create_test_store();
    store
        .execute_batch(
            "INSERT INTO inverters (id, report_id, model_identifier) VALUES (10, 1, 'INV-7');
             INSERT INTO equipment (id, report_id, equipment_type, characteristics) VALUES
                (1, 1, 'String Measurement', 'Inverter: INV-7 | MPPT: 2 | String: 3 | Voc: 600V | Current: 8A');",
        )
        .unwrap();

    let result = Reconciler::new(&store, EngineConfig::default()).reconcile_measurements(1);

    assert_eq!(result.records.len(), 1);
    let json = serde_json::to_value(&result.records[0]).unwrap();
    assert_eq!(json["inverterIndex"], 0);
    assert_eq!(json["mpptIndex"], 2);
    assert_eq!(json["stringIndex"], 3);
    assert_eq!(json["voc"], "600");
    assert_eq!(json["isc"], "8");
    assert_eq!(json["impp"], "");
    assert!(result.diagnostics.source_errors.is_empty());
}

#[test]
fn test_structured_rows_override_legacy_except_zero_over_text() {
    let (_temp, store) = create_test_store();
    store
        .execute_batch(
            "INSERT INTO inverters (id, report_id, model_identifier) VALUES (10, 1, 'INV-1'), (11, 1, 'INV-2');
             INSERT INTO equipment (id, report_id, equipment_type, characteristics) VALUES
                (1, 1, 'String Measurement', 'Inverter: INV-2 | MPPT: 1 | String: 1 | Voc: partial shade – tree | Notes: checked'),
                (2, 1, 'String Measurement', 'Inverter: INV-1 | MPPT: 1 | String: 2 | Voc: 598,5 V');
             INSERT INTO string_measurements (report_id, inverter_index, mppt_index, string_index, voc, isc) VALUES
                (1, 1, 1, 1, 0.0, 4.2),
                (1, 0, 1, 2, 601.0, NULL),
                (1, 0, 2, 1, 590.0, 8.1);",
        )
        .unwrap();

    let result = Reconciler::new(&store, EngineConfig::default()).reconcile_measurements(1);

    let ids: Vec<MeasurementIdentity> = result.records.iter().map(|r| r.identity).collect();
    assert_eq!(
        ids,
        vec![
            MeasurementIdentity::new(0, 1, 2),
            MeasurementIdentity::new(0, 2, 1),
            MeasurementIdentity::new(1, 1, 1),
        ]
    );

    let shaded = &result.records[2];
    assert_eq!(shaded.inverter_number, 2);
    assert_eq!(shaded.values["voc"], "partial shade – tree");
    assert_eq!(shaded.values["isc"], "4.2");
    assert_eq!(shaded.values["notes"], "checked");

    assert_eq!(result.records[0].values["voc"], "601");
    assert_eq!(result.records[1].values["isc"], "8.1");

    assert_eq!(result.diagnostics.legacy_rows, 2);
    assert_eq!(result.diagnostics.structured_rows, 3);
    assert_eq!(result.diagnostics.merge.zero_overrides_rejected, 1);
    assert_eq!(result.diagnostics.merge.overlay_only, 1);
}

#[test]
fn test_reconciliation_is_repeatable() {
    let (_temp, store) = create_test_store();
    store
        .execute_batch(
            "INSERT INTO inverters (id, report_id, model_identifier) VALUES (10, 1, 'INV-1');
             INSERT INTO equipment (id, report_id, equipment_type, characteristics) VALUES
                (1, 1, 'String Measurement', 'String: 1 | Voc: 600V'),
                (2, 1, 'String Measurement', 'String: 2 | Voc: not measured');
             INSERT INTO string_measurements (report_id, inverter_index, mppt_index, string_index, voc) VALUES
                (1, 0, 1, 2, 0);",
        )
        .unwrap();

    let reconciler = Reconciler::new(&store, EngineConfig::default());
    let first = reconciler.reconcile_measurements(1);
    let second = reconciler.reconcile_measurements(1);
    assert_eq!(first, second);
    assert_eq!(first.records[1].values["voc"], "not measured");
}

#[test]
fn test_migrated_rows_are_not_read_as_legacy() {
    let (_temp, store) = create_test_store();
    store
        .execute_batch(
            "INSERT INTO equipment (id, report_id, equipment_type, characteristics) VALUES
                (1, 1, 'Punch List Item', 'Description: Missing labels | Severity: Low'),
                (2, 1, 'Punch List Item (migrated)', 'Description: Old item');",
        )
        .unwrap();

    let result = Reconciler::new(&store, EngineConfig::default()).reconcile_punch_list(1);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].identity.description, "Missing labels");
    assert_eq!(result.records[0].values["severity"], "Low");
}

#[test]
fn test_unknown_database_renders_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::open(temp_dir.path().join("empty.sqlite")).unwrap();

    let result = Reconciler::new(&store, EngineConfig::default()).reconcile_measurements(1);
    assert!(result.records.is_empty());
    assert!(result.diagnostics.source_errors.is_empty());
}

#[test]
fn test_custom_tags_and_tables() {
    let temp_dir = TempDir::new().unwrap();
    let config = EngineConfig {
        measurement_tag: "StringTest".to_string(),
        equipment_table: "site_equipment".to_string(),
        ..Default::default()
    };
    let store =
        SqliteStore::with_config(temp_dir.path().join("site.sqlite"), config.clone()).unwrap();
    store.ensure_schema().unwrap();
    store
        .execute_batch(
            "INSERT INTO site_equipment (id, report_id, equipment_type, characteristics) VALUES
                (1, 3, 'StringTest', 'Tensão de circuito aberto: 612 V | Corrente de curto-circuito: 9,1 A');",
        )
        .unwrap();

    let result = Reconciler::new(&store, config).reconcile_measurements(3);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].values["voc"], "612");
    assert_eq!(result.records[0].values["isc"], "9.1");
    // No inverters on the report: position 0, flagged.
    assert_eq!(result.diagnostics.unresolved_references.len(), 1);
}
