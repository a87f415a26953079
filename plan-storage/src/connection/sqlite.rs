//! SQLite data source: pooled rusqlite connections with explicit transactions.
//!
//! Every checked-out connection opens a deferred transaction lazily on its
//! first statement. `commit` / `rollback` end it; `close` rolls back anything
//! still open before the connection goes back to the pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use plan_core::config::SqliteConfig;
use plan_core::errors::StorageError;
use plan_core::{DatabaseConfig, Dialect};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::params_from_iter;

use super::{Connection, DataSource, DataSourceFactory, Row, SqlValue};

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(v) => SqlValue::Integer(v),
            ValueRef::Real(v) => SqlValue::Real(v),
            ValueRef::Text(v) | ValueRef::Blob(v) => {
                SqlValue::Text(String::from_utf8_lossy(v).into_owned())
            }
        }
    }
}

/// Apply per-connection pragmas. WAL is only meaningful for file databases.
fn apply_pragmas(
    conn: &rusqlite::Connection,
    busy_timeout_ms: u64,
    file_backed: bool,
) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    if file_backed {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
    }
    conn.execute_batch("PRAGMA temp_store = MEMORY;")
}

/// Pooled SQLite connections.
pub struct SqliteDataSource {
    pool: r2d2::Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
}

impl SqliteDataSource {
    pub fn open(config: &SqliteConfig) -> Result<Self, StorageError> {
        let busy_timeout_ms = config.effective_busy_timeout_ms();
        let file_backed = config.path.is_some();
        let manager = match &config.path {
            Some(path) => SqliteConnectionManager::file(path),
            None => SqliteConnectionManager::memory(),
        }
        .with_init(move |conn| apply_pragmas(conn, busy_timeout_ms, file_backed));

        let mut builder = r2d2::Pool::builder()
            .max_size(config.effective_pool_size())
            .connection_timeout(CHECKOUT_TIMEOUT);
        if !file_backed {
            // The single in-memory connection *is* the database; never recycle it.
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        let pool = builder.build(manager).map_err(|e| StorageError::Pool {
            message: e.to_string(),
        })?;

        tracing::debug!(
            path = ?config.path,
            pool_size = config.effective_pool_size(),
            "opened sqlite data source"
        );

        Ok(Self {
            pool,
            path: config.path.clone(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(&SqliteConfig::default())
    }

    pub fn open_file(path: &Path) -> Result<Self, StorageError> {
        Self::open(&SqliteConfig {
            path: Some(path.to_path_buf()),
            ..SqliteConfig::default()
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl DataSource for SqliteDataSource {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn get_connection(&self) -> Result<Box<dyn Connection>, StorageError> {
        let conn = self.pool.get().map_err(StorageError::connection)?;
        Ok(Box::new(SqliteConnection { conn }))
    }

    fn close(&self) -> Result<(), StorageError> {
        if self.path.is_some() {
            let conn = self.pool.get().map_err(StorageError::connection)?;
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(StorageError::sql)?;
        }
        Ok(())
    }
}

/// A pooled connection running in explicit-transaction mode.
pub struct SqliteConnection {
    conn: PooledConnection<SqliteConnectionManager>,
}

impl SqliteConnection {
    fn ensure_transaction(&mut self) -> Result<(), StorageError> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN DEFERRED")
                .map_err(|e| StorageError::sql(format!("begin transaction: {e}")))?;
        }
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize, StorageError> {
        self.ensure_transaction()?;
        let mut stmt = self.conn.prepare_cached(sql).map_err(StorageError::sql)?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(StorageError::sql)
    }

    fn execute_many(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<usize, StorageError> {
        self.ensure_transaction()?;
        let mut stmt = self.conn.prepare_cached(sql).map_err(StorageError::sql)?;
        let mut affected = 0;
        for params in rows {
            affected += stmt
                .execute(params_from_iter(params.iter()))
                .map_err(StorageError::sql)?;
        }
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StorageError> {
        self.ensure_transaction()?;
        let mut stmt = self.conn.prepare_cached(sql).map_err(StorageError::sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(StorageError::sql)?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(StorageError::sql)? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(SqlValue::from(row.get_ref(idx).map_err(StorageError::sql)?));
            }
            result.push(Row::new(values));
        }
        Ok(result)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .map_err(|e| StorageError::sql(format!("commit: {e}")))?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| StorageError::sql(format!("rollback: {e}")))?;
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), StorageError> {
        self.rollback()
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        // Never hand a connection with an open transaction back to the pool.
        if !self.conn.is_autocommit() {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

/// Opens [`SqliteDataSource`]s. MySQL data sources are supplied by the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDataSourceFactory;

impl DataSourceFactory for SqliteDataSourceFactory {
    fn open(&self, config: &DatabaseConfig) -> Result<Arc<dyn DataSource>, StorageError> {
        match config.dialect {
            Dialect::Sqlite => Ok(Arc::new(SqliteDataSource::open(&config.sqlite)?)),
            Dialect::MySql => Err(StorageError::NotSupported {
                operation: "open MySQL data source".to_string(),
                reason: "no MySQL driver is bundled; supply a DataSourceFactory".to_string(),
            }),
        }
    }
}
