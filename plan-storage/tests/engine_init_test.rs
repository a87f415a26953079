//! Engine initialization against fresh, restarted and older databases.

use std::path::Path;
use std::sync::Arc;

use plan_core::diagnostics::test_helpers::{LogLevel, RecordingBenchmark, RecordingLogSink};
use plan_core::{DatabaseConfig, Dialect, InitError, PlanConfig, StorageError};
use plan_storage::schema::{column_exists, table_exists};
use plan_storage::tables::tps::Tps;
use plan_storage::tables::{Table, Tables, VersionTable};
use plan_storage::{DataSource, DatabaseEngine, EngineState, SqliteDataSource, LATEST_SCHEMA_VERSION};
use tempfile::TempDir;
use uuid::Uuid;

const NEW_DATABASE: &str = "New database created.";

fn file_engine(path: &Path) -> (DatabaseEngine, Arc<RecordingLogSink>) {
    let config = PlanConfig {
        database: DatabaseConfig::sqlite_file(path),
        ..Default::default()
    };
    let log = Arc::new(RecordingLogSink::new());
    let engine = DatabaseEngine::sqlite(config).with_sinks(log.clone(), Arc::new(RecordingBenchmark::new()));
    (engine, log)
}

fn created_new_database(log: &RecordingLogSink) -> bool {
    log.messages(LogLevel::Info).iter().any(|m| m == NEW_DATABASE)
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[test]
fn fresh_database_is_created_at_latest_version() {
    let dir = TempDir::new().unwrap();
    let (engine, log) = file_engine(&dir.path().join("plan.db"));

    engine.init().unwrap();

    assert_eq!(engine.state(), EngineState::Ready);
    assert!(created_new_database(&log));
    assert_eq!(engine.get_version().unwrap(), Some(LATEST_SCHEMA_VERSION));
    assert!(!engine.is_new_database().unwrap());

    let mut conn = engine.get_connection().unwrap();
    assert!(table_exists(conn.as_mut(), Dialect::Sqlite, "plan_version").unwrap());
    for table in engine.tables().all() {
        assert!(
            table_exists(conn.as_mut(), Dialect::Sqlite, table.name()).unwrap(),
            "{} missing",
            table.name()
        );
    }
    engine.end_transaction(conn).unwrap();
    engine.close().unwrap();
}

#[test]
fn restart_does_not_report_new_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.db");

    let (first, first_log) = file_engine(&path);
    first.init().unwrap();
    assert!(created_new_database(&first_log));
    first.close().unwrap();

    let (second, second_log) = file_engine(&path);
    second.init().unwrap();
    assert!(!created_new_database(&second_log));
    assert_eq!(second.get_version().unwrap(), Some(LATEST_SCHEMA_VERSION));
    second.close().unwrap();
}

#[test]
fn tables_without_version_row_still_count_as_new() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.db");

    // Tables created but the version write never happened.
    {
        let source = SqliteDataSource::open_file(&path).unwrap();
        let mut conn = source.get_connection().unwrap();
        let tables = Tables::new(Dialect::Sqlite);
        for table in tables.all() {
            table.create_table(conn.as_mut()).unwrap();
        }
        VersionTable::new(Dialect::Sqlite)
            .create_table(conn.as_mut())
            .unwrap();
        conn.commit().unwrap();
        conn.close().unwrap();
    }

    let (engine, log) = file_engine(&path);
    engine.init().unwrap();
    assert!(created_new_database(&log));
    assert_eq!(engine.get_version().unwrap(), Some(LATEST_SCHEMA_VERSION));
}

#[test]
fn version_five_database_is_upgraded_in_place() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.db");
    let recent = now_ms();

    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE plan_version (version INTEGER NOT NULL);
             INSERT INTO plan_version (version) VALUES (5);
             CREATE TABLE plan_users (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 uuid TEXT NOT NULL UNIQUE,
                 registered BIGINT NOT NULL,
                 name TEXT NOT NULL
             );
             INSERT INTO plan_users (uuid, registered, name)
                 VALUES ('8c8f1bd9-3a4e-4f4b-9b4a-6f1b0c2d7e11', 1000, 'Steve'),
                        ('0f6b7d52-91a3-4c7e-8d2e-7a5c3b9e4f20', 2000, 'Alex');
             CREATE TABLE plan_tps (
                 server_id INTEGER NOT NULL,
                 date BIGINT NOT NULL,
                 tps REAL NOT NULL,
                 players_online INTEGER NOT NULL,
                 cpu_usage REAL NOT NULL,
                 ram_usage BIGINT NOT NULL,
                 entities INTEGER NOT NULL,
                 chunks_loaded INTEGER NOT NULL
             );",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO plan_tps VALUES (1, ?1, 20.0, 3, 0.5, 1024, 50, 200)",
            [recent],
        )
        .unwrap();
    }

    let (engine, log) = file_engine(&path);
    engine.init().unwrap();
    assert!(!created_new_database(&log));
    assert_eq!(engine.get_version().unwrap(), Some(LATEST_SCHEMA_VERSION));

    let users = engine
        .with_transaction(|conn| {
            assert!(column_exists(conn, Dialect::Sqlite, "plan_users", "times_kicked")?);
            engine.tables().users.get_saved_uuids(conn)
        })
        .unwrap();
    assert_eq!(users.len(), 2, "existing rows must survive the upgrade");

    let steve: Uuid = "8c8f1bd9-3a4e-4f4b-9b4a-6f1b0c2d7e11".parse().unwrap();
    let kicked = engine
        .with_transaction(|conn| engine.tables().users.get_times_kicked(conn, &steve))
        .unwrap();
    assert_eq!(kicked, 0);

    let samples = engine
        .with_transaction(|conn| engine.tables().tps.get_tps_data(conn, 1))
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].free_disk_space, -1);
}

#[test]
fn newer_version_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.db");

    let (first, _) = file_engine(&path);
    first.init().unwrap();
    first.set_version(LATEST_SCHEMA_VERSION + 1).unwrap();
    first.close().unwrap();

    let (second, _) = file_engine(&path);
    second.init().unwrap();
    assert_eq!(second.get_version().unwrap(), Some(LATEST_SCHEMA_VERSION + 1));
}

#[test]
fn retention_pass_prunes_old_samples_but_keeps_peak() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.db");
    let day = 24 * 60 * 60 * 1000_i64;
    let now = now_ms();

    let (first, _) = file_engine(&path);
    first.init().unwrap();
    first
        .with_transaction(|conn| {
            let tps = &first.tables().tps;
            for (date, players) in [(now - 90 * day, 50), (now - 60 * day, 2), (now - day, 4)] {
                tps.insert_tps(
                    conn,
                    1,
                    &Tps {
                        date,
                        tps: 20.0,
                        players_online: players,
                        cpu_usage: 0.1,
                        ram_usage: 512,
                        entities: 10,
                        chunks_loaded: 20,
                        free_disk_space: 1000,
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();
    first.close().unwrap();

    let (second, _) = file_engine(&path);
    second.init().unwrap();
    let players: Vec<_> = second
        .with_transaction(|conn| second.tables().tps.get_tps_data(conn, 1))
        .unwrap()
        .into_iter()
        .map(|t| t.players_online)
        .collect();
    assert_eq!(players, vec![50, 4]);
}

#[test]
fn mysql_without_driver_fails_as_data_source_error() {
    let config = PlanConfig {
        database: DatabaseConfig {
            dialect: Dialect::MySql,
            ..DatabaseConfig::sqlite_in_memory()
        },
        ..Default::default()
    };
    let log = Arc::new(RecordingLogSink::new());
    let bench = Arc::new(RecordingBenchmark::new());
    let engine = DatabaseEngine::sqlite(config).with_sinks(log.clone(), bench.clone());

    let err = engine.init().unwrap_err();
    assert!(matches!(
        err,
        InitError::DataSource(StorageError::NotSupported { .. })
    ));
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(!log.messages(LogLevel::Error).is_empty());
    assert!(bench.stopped().iter().any(|(_, name)| name == "Init MySQL"));
    assert!(matches!(engine.init(), Err(InitError::AlreadyInitialized)));
}
