//! # plan-storage
//!
//! Relational persistence layer for the Plan analytics dataset.
//! Two SQL dialects (SQLite with explicit transactions, MySQL in autocommit),
//! pooled connections, bounded batches for bulk writes, per-table schema
//! ownership with additive migration, and an engine that orders
//! initialization, retention cleanup and multi-table removal.

pub mod batch;
pub mod connection;
pub mod engine;
pub mod schema;
pub mod tables;

pub use batch::{split_into_batches, split_into_batches_id, Container, BATCH_SIZE};
pub use connection::{Connection, DataSource, DataSourceFactory, Row, SqlValue};
pub use connection::sqlite::{SqliteDataSource, SqliteDataSourceFactory};
pub use engine::{DatabaseEngine, EngineState};
pub use schema::LATEST_SCHEMA_VERSION;
pub use tables::{IdentityTable, Table, TableId};
