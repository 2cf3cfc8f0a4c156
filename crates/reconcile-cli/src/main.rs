//! PV Reconcile - operator CLI for the reconciliation engine.
//!
//! Prints merged report data or migration reports as JSON on stdout.
//! Logs go to stderr so the output can be piped.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reconcile_core::{EngineConfig, MigrationDriver, MigrationMode, Reconciler, SqliteStore};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pv-reconcile")]
#[command(about = "Reconcile legacy commissioning data with structured tables")]
struct Args {
    /// Engine config file (JSON) overriding tags and table names
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the merged records of one report
    Reconcile {
        /// Path to the commissioning database
        #[arg(long)]
        db: PathBuf,

        /// Report identifier
        #[arg(long)]
        report: i64,

        /// Reconcile punch-list items instead of string measurements
        #[arg(long)]
        punch_list: bool,
    },

    /// Move legacy punch-list rows into the structured table
    Migrate {
        /// Path to the commissioning database
        #[arg(long)]
        db: PathBuf,

        /// Only migrate rows of this report
        #[arg(long)]
        report: Option<i64>,

        /// Report the statements without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let output = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(args: &Args) -> Result<Value> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match &args.command {
        Command::Reconcile {
            db,
            report,
            punch_list,
        } => {
            let store = open_store(db, &config)?;
            let reconciler = Reconciler::new(&store, config);
            let output = if *punch_list {
                serde_json::to_value(reconciler.reconcile_punch_list(*report))?
            } else {
                serde_json::to_value(reconciler.reconcile_measurements(*report))?
            };
            Ok(output)
        }
        Command::Migrate {
            db,
            report,
            dry_run,
        } => {
            let store = open_store(db, &config)?;
            let mode = if *dry_run {
                MigrationMode::DryRun
            } else {
                MigrationMode::Execute
            };
            let result = MigrationDriver::new(&store, &config).run(mode, *report)?;
            Ok(serde_json::to_value(result)?)
        }
    }
}

/// Open an existing database; a mistyped path must not create an empty one.
fn open_store(db: &Path, config: &EngineConfig) -> Result<SqliteStore> {
    if !db.is_file() {
        bail!("Database not found: {}", db.display());
    }
    info!("Database: {}", db.display());
    Ok(SqliteStore::with_config(db, config.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("commissioning.sqlite");
        let store = SqliteStore::open(&path).unwrap();
        store.ensure_schema().unwrap();
        store
            .execute_batch(
                "INSERT INTO inverters (id, report_id, model_identifier) VALUES (10, 1, 'INV-7');
                 INSERT INTO equipment (id, report_id, equipment_type, characteristics) VALUES
                    (1, 1, 'String Measurement', 'Inverter: INV-7 | MPPT: 2 | String: 3 | Voc: 600V'),
                    (2, 1, 'Punch List Item', 'Description: Loose MC4 | Severity: High');",
            )
            .unwrap();
        (temp_dir, path)
    }

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_reconcile_prints_records() {
        let (_temp, db) = create_test_db();
        let db = db.to_str().unwrap();

        let output = run(&parse(&["pv-reconcile", "reconcile", "--db", db, "--report", "1"])).unwrap();
        assert_eq!(output["reportId"], 1);
        assert_eq!(output["records"][0]["mpptIndex"], 2);
        assert_eq!(output["records"][0]["voc"], "600");

        let output = run(&parse(&[
            "pv-reconcile", "reconcile", "--db", db, "--report", "1", "--punch-list",
        ]))
        .unwrap();
        assert_eq!(output["records"][0]["description"], "Loose MC4");
        assert_eq!(output["records"][0]["itemNumber"], 1);
    }

    #[test]
    fn test_migrate_dry_run_then_execute() {
        let (_temp, db) = create_test_db();
        let db = db.to_str().unwrap();

        let preview = run(&parse(&["pv-reconcile", "migrate", "--db", db, "--dry-run"])).unwrap();
        assert_eq!(preview["dryRun"], true);
        assert_eq!(preview["migrated"], 1);

        let done = run(&parse(&["pv-reconcile", "--debug", "migrate", "--db", db])).unwrap();
        assert_eq!(done["dryRun"], false);
        assert_eq!(done["migrated"], 1);

        let again = run(&parse(&["pv-reconcile", "migrate", "--db", db])).unwrap();
        assert_eq!(again["rowsConsidered"], 0);
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("typo.sqlite");
        let args = parse(&["pv-reconcile", "migrate", "--db", db.to_str().unwrap()]);
        assert!(run(&args).is_err());
        assert!(!db.exists());
    }

    #[test]
    fn test_config_file_overrides_tags() {
        let (temp, db) = create_test_db();
        let config_path = temp.path().join("engine.json");
        std::fs::write(&config_path, r#"{"punchListTag": "Snag"}"#).unwrap();

        let output = run(&parse(&[
            "pv-reconcile",
            "migrate",
            "--config",
            config_path.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(output["rowsConsidered"], 0);
    }
}
