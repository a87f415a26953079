//! `DatabaseEngine`: owns the data source, the version table and every entity
//! table, and runs each unit of work on its own pooled connection.
//!
//! Lifecycle: `Uninitialized → SettingUp → Cleaning → Ready`, `Failed` from
//! any init step, `Closed` after [`DatabaseEngine::close`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use plan_core::errors::{InitError, StorageError};
use plan_core::{BenchmarkSink, Dialect, LogSink, PlanConfig, TracingBenchmark, TracingLogSink};
use uuid::Uuid;

use crate::connection::sqlite::SqliteDataSourceFactory;
use crate::connection::{Connection, DataSource, DataSourceFactory};
use crate::schema::LATEST_SCHEMA_VERSION;
use crate::tables::{now_ms, Table, Tables, VersionTable, REMOVAL_ORDER};

const BENCH_SOURCE: &str = "Database";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    SettingUp,
    Cleaning,
    Ready,
    Failed,
    Closed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::SettingUp => "setting up",
            Self::Cleaning => "cleaning",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

pub struct DatabaseEngine {
    config: PlanConfig,
    factory: Box<dyn DataSourceFactory>,
    source: RwLock<Option<Arc<dyn DataSource>>>,
    state: Mutex<EngineState>,
    version: VersionTable,
    tables: Tables,
    log: Arc<dyn LogSink>,
    bench: Arc<dyn BenchmarkSink>,
}

impl DatabaseEngine {
    /// Engine for the configured dialect, logging and timing through `tracing`.
    pub fn new(config: PlanConfig, factory: impl DataSourceFactory + 'static) -> Self {
        let dialect = config.database.dialect;
        Self {
            config,
            factory: Box::new(factory),
            source: RwLock::new(None),
            state: Mutex::new(EngineState::Uninitialized),
            version: VersionTable::new(dialect),
            tables: Tables::new(dialect),
            log: Arc::new(TracingLogSink),
            bench: Arc::new(TracingBenchmark::new()),
        }
    }

    /// Engine backed by the bundled SQLite data source.
    pub fn sqlite(config: PlanConfig) -> Self {
        Self::new(config, SqliteDataSourceFactory)
    }

    /// Replace the logger and benchmark sinks.
    pub fn with_sinks(mut self, log: Arc<dyn LogSink>, bench: Arc<dyn BenchmarkSink>) -> Self {
        self.log = log;
        self.bench = bench;
        self
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.database.dialect
    }

    pub fn state(&self) -> EngineState {
        *self.lock_state()
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn version_table(&self) -> &VersionTable {
        &self.version
    }

    // ─── Initialization ─────────────────────────────────────────────────

    /// Open the data source, create or patch every table, write the latest
    /// schema version and prune expired samples. One-shot per engine.
    pub fn init(&self) -> Result<(), InitError> {
        {
            let mut state = self.lock_state();
            if *state != EngineState::Uninitialized {
                return Err(InitError::AlreadyInitialized);
            }
            *state = EngineState::SettingUp;
        }

        let bench_name = format!("Init {}", self.config.database.config_name());
        self.bench.start(&bench_name);
        let result = self.run_init();
        self.bench.stop(BENCH_SOURCE, &bench_name);

        match &result {
            Ok(()) => self.set_state(EngineState::Ready),
            Err(e) => {
                self.set_state(EngineState::Failed);
                self.log.error("Database initialization failed", e);
                self.release_source();
            }
        }
        result
    }

    fn run_init(&self) -> Result<(), InitError> {
        self.setup_data_source().map_err(InitError::DataSource)?;
        self.setup_database().map_err(InitError::Setup)?;
        self.set_state(EngineState::Cleaning);
        self.clean().map_err(InitError::Clean)?;
        Ok(())
    }

    fn setup_data_source(&self) -> Result<(), StorageError> {
        let source = self.factory.open(&self.config.database)?;
        if source.dialect() != self.dialect() {
            return Err(StorageError::DialectMismatch {
                configured: self.dialect().to_string(),
                actual: source.dialect().to_string(),
            });
        }
        *self.source.write().unwrap_or_else(PoisonError::into_inner) = Some(source);
        self.log.debug(&format!("{} data source opened", self.dialect()));
        Ok(())
    }

    /// Schema creation and the version write share one unit of work, so an
    /// interrupted first run still reads as a new database on the next start.
    fn setup_database(&self) -> Result<(), StorageError> {
        self.unit_of_work(|conn| {
            let new_database = self.version.is_new_database(conn)?;
            self.version.create_table(conn)?;
            self.create_tables(conn)?;
            if new_database {
                self.log.info("New database created.");
            }

            match self.version.get_version(conn)? {
                Some(stored) if stored >= LATEST_SCHEMA_VERSION => {
                    tracing::debug!(version = stored, "schema is current");
                }
                stored => {
                    self.version.set_version(conn, LATEST_SCHEMA_VERSION)?;
                    tracing::info!(from = ?stored, to = LATEST_SCHEMA_VERSION, "schema version updated");
                }
            }
            Ok(())
        })
    }

    fn create_tables(&self, conn: &mut dyn Connection) -> Result<(), StorageError> {
        self.bench.start("Create tables");
        let result = self.tables.all().try_for_each(|table| {
            tracing::debug!(table = table.name(), "creating table");
            table.create_table(conn)
        });
        self.bench.stop(BENCH_SOURCE, "Create tables");
        result
    }

    /// Retention pass over time-series data.
    fn clean(&self) -> Result<(), StorageError> {
        let cutoff = now_ms() - self.config.retention.tps_retention_ms();
        let removed = self.unit_of_work(|conn| self.tables.tps.clean(conn, cutoff))?;
        self.log.debug(&format!("Clean removed {removed} TPS samples"));
        Ok(())
    }

    // ─── Units of work ──────────────────────────────────────────────────

    /// Check out a connection. The pool handle is cloned out of the lock
    /// before checkout, so a blocking pool never holds engine locks.
    pub fn get_connection(&self) -> Result<Box<dyn Connection>, StorageError> {
        let source = self
            .source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StorageError::NotInitialized)?;
        source.get_connection()
    }

    /// Commit (explicit-transaction dialects only), then release. The
    /// connection is released even when the commit fails.
    pub fn commit(&self, mut conn: Box<dyn Connection>) -> Result<(), StorageError> {
        let committed = if self.dialect().uses_explicit_transactions() {
            conn.commit()
        } else {
            Ok(())
        };
        self.finish(committed, conn)
    }

    /// Roll back (explicit-transaction dialects only), then release. The
    /// connection is released even when the rollback fails.
    pub fn rollback(&self, mut conn: Box<dyn Connection>) -> Result<(), StorageError> {
        let rolled_back = if self.dialect().uses_explicit_transactions() {
            conn.rollback()
        } else {
            Ok(())
        };
        self.finish(rolled_back, conn)
    }

    /// Release a connection back to its pool.
    pub fn end_transaction(&self, conn: Box<dyn Connection>) -> Result<(), StorageError> {
        conn.close()
    }

    fn finish(&self, outcome: Result<(), StorageError>, conn: Box<dyn Connection>) -> Result<(), StorageError> {
        let released = self.end_transaction(conn);
        match (outcome, released) {
            (Err(e), Err(release)) => {
                self.log.error("Failed to release connection", &release);
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Run `f` on one connection: commit on `Ok`, roll back on `Err`.
    /// Only available once the engine is ready.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut dyn Connection) -> Result<T, StorageError>,
    {
        self.ensure_ready()?;
        self.unit_of_work(f)
    }

    fn unit_of_work<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut dyn Connection) -> Result<T, StorageError>,
    {
        let mut conn = self.get_connection()?;
        match f(conn.as_mut()) {
            Ok(value) => {
                self.commit(conn)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback(conn) {
                    self.log.error("Rollback failed", &rollback);
                }
                Err(e)
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), StorageError> {
        match self.state() {
            EngineState::Ready => Ok(()),
            EngineState::Uninitialized => Err(StorageError::NotInitialized),
            other => Err(StorageError::InvalidState {
                expected: EngineState::Ready.to_string(),
                actual: other.to_string(),
            }),
        }
    }

    // ─── Version ────────────────────────────────────────────────────────

    pub fn is_new_database(&self) -> Result<bool, StorageError> {
        self.unit_of_work(|conn| self.version.is_new_database(conn))
    }

    pub fn get_version(&self) -> Result<Option<u32>, StorageError> {
        self.unit_of_work(|conn| self.version.get_version(conn))
    }

    pub fn set_version(&self, version: u32) -> Result<(), StorageError> {
        self.unit_of_work(|conn| self.version.set_version(conn, version))
    }

    // ─── Identity operations ────────────────────────────────────────────

    /// Whether the identity has a stored user row. Lookup failures are
    /// logged and read as `false`.
    pub fn was_seen_before(&self, uuid: Option<&Uuid>) -> bool {
        let Some(uuid) = uuid else {
            return false;
        };
        match self.with_transaction(|conn| self.tables.users.is_registered(conn, uuid)) {
            Ok(seen) => seen,
            Err(e) => {
                self.log.error(&format!("Failed to look up {uuid}"), &e);
                false
            }
        }
    }

    /// Delete every row owned by the identity, dependents before the user
    /// row. Each table is its own unit of work; a failure stops the pass and
    /// leaves earlier tables cleared. `None` is a no-op.
    pub fn remove_account(&self, uuid: Option<&Uuid>) -> Result<(), StorageError> {
        let Some(uuid) = uuid else {
            return Ok(());
        };
        self.ensure_ready()?;

        self.bench.start("Remove Account");
        let result = REMOVAL_ORDER.iter().try_for_each(|(id, _)| {
            let table = self.tables.get(*id);
            let Some(identity) = table.as_identity_table() else {
                return Ok(());
            };
            let removed = self.unit_of_work(|conn| identity.remove_user(conn, uuid))?;
            tracing::debug!(table = table.name(), removed, "removed account rows");
            Ok(())
        });
        self.bench.stop(BENCH_SOURCE, "Remove Account");

        match &result {
            Ok(()) => self.log.debug(&format!("Removed account {uuid}")),
            Err(e) => self.log.error(&format!("Failed to remove account {uuid}"), e),
        }
        result
    }

    /// Empty every table in removal order. Each table is its own unit of
    /// work; a failure stops the pass and leaves earlier tables emptied.
    pub fn remove_all_data(&self) -> Result<(), StorageError> {
        self.ensure_ready()?;
        self.bench.start("Remove All Data");
        let result = self
            .tables
            .in_remove_order()
            .try_for_each(|table| self.unit_of_work(|conn| table.remove_all_data(conn)));
        self.bench.stop(BENCH_SOURCE, "Remove All Data");

        match &result {
            Ok(()) => self.log.info("Removed all data."),
            Err(e) => self.log.error("Failed to remove all data", e),
        }
        result
    }

    // ─── Shutdown ───────────────────────────────────────────────────────

    /// Close the data source. Further units of work fail with `NotInitialized`.
    pub fn close(&self) -> Result<(), StorageError> {
        let source = self.source.write().unwrap_or_else(PoisonError::into_inner).take();
        self.set_state(EngineState::Closed);
        match source {
            Some(source) => source.close(),
            None => Ok(()),
        }
    }

    /// Drop the data source after a failed init so nothing can check out
    /// connections from a half-initialized engine.
    fn release_source(&self) {
        let source = self.source.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(source) = source {
            if let Err(e) = source.close() {
                self.log.error("Failed to close data source", &e);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: EngineState) {
        let mut state = self.lock_state();
        let previous = *state;
        tracing::debug!(from = %previous, to = %next, "engine state");
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::diagnostics::test_helpers::{LogLevel, RecordingBenchmark, RecordingLogSink};

    fn engine() -> (DatabaseEngine, Arc<RecordingLogSink>, Arc<RecordingBenchmark>) {
        let log = Arc::new(RecordingLogSink::new());
        let bench = Arc::new(RecordingBenchmark::new());
        let engine = DatabaseEngine::sqlite(PlanConfig::default()).with_sinks(log.clone(), bench.clone());
        (engine, log, bench)
    }

    #[test]
    fn init_reaches_ready_and_times_itself() {
        let (engine, log, bench) = engine();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        engine.init().unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(log.messages(LogLevel::Info).iter().any(|m| m == "New database created."));
        assert!(bench.stopped().iter().any(|(_, name)| name == "Init SQLite"));
    }

    #[test]
    fn second_init_is_rejected() {
        let (engine, _, _) = engine();
        engine.init().unwrap();
        assert!(matches!(engine.init(), Err(InitError::AlreadyInitialized)));
        assert_eq!(engine.state(), EngineState::Ready);
    }

    #[test]
    fn operations_before_init_fail() {
        let (engine, _, _) = engine();
        assert!(matches!(engine.get_connection(), Err(StorageError::NotInitialized)));
        assert!(matches!(engine.remove_all_data(), Err(StorageError::NotInitialized)));
        assert!(!engine.was_seen_before(Some(&Uuid::new_v4())));
    }

    #[test]
    fn null_identity_is_noop() {
        let (engine, _, bench) = engine();
        engine.init().unwrap();
        assert!(!engine.was_seen_before(None));
        engine.remove_account(None).unwrap();
        assert!(!bench.started().iter().any(|name| name == "Remove Account"));
    }

    #[test]
    fn close_stops_units_of_work() {
        let (engine, _, _) = engine();
        engine.init().unwrap();
        engine.close().unwrap();
        assert_eq!(engine.state(), EngineState::Closed);
        assert!(matches!(engine.get_connection(), Err(StorageError::NotInitialized)));
    }
}
