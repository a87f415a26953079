//! Connection abstraction shared by both dialects.
//!
//! A [`DataSource`] hands out one [`Connection`] per unit of work. The
//! connection is owned by the caller until it is committed or rolled back
//! and then closed, which returns it to the pool.

pub mod sqlite;
pub mod value;

use std::sync::Arc;

use plan_core::errors::StorageError;
use plan_core::{DatabaseConfig, Dialect};

pub use value::{Row, SqlValue};

/// One checked-out connection.
pub trait Connection: Send {
    /// Run a statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize, StorageError>;

    /// Run one prepared statement once per parameter set.
    fn execute_many(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<usize, StorageError> {
        let mut affected = 0;
        for params in rows {
            affected += self.execute(sql, params)?;
        }
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    fn rollback(&mut self) -> Result<(), StorageError>;

    /// Release the connection. Must be called on every exit path.
    fn close(self: Box<Self>) -> Result<(), StorageError>;

    /// First row of the result, if any.
    fn query_row(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, StorageError> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    fn exists(&mut self, sql: &str, params: &[SqlValue]) -> Result<bool, StorageError> {
        Ok(!self.query(sql, params)?.is_empty())
    }
}

/// A pool of connections for one dialect.
pub trait DataSource: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Check out a connection. May block while the pool is exhausted.
    fn get_connection(&self) -> Result<Box<dyn Connection>, StorageError>;

    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Builds the data source for the configured dialect.
pub trait DataSourceFactory: Send + Sync {
    fn open(&self, config: &DatabaseConfig) -> Result<Arc<dyn DataSource>, StorageError>;
}

impl<F> DataSourceFactory for F
where
    F: Fn(&DatabaseConfig) -> Result<Arc<dyn DataSource>, StorageError> + Send + Sync,
{
    fn open(&self, config: &DatabaseConfig) -> Result<Arc<dyn DataSource>, StorageError> {
        self(config)
    }
}
