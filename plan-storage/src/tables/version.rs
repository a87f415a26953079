//! Schema version table: a single integer row.

use plan_core::errors::StorageError;
use plan_core::Dialect;

use super::Table;
use crate::connection::Connection;
use crate::schema::{self, Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[Column::new("version", ColumnKind::Int)];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_version",
    columns: COLUMNS,
};

pub struct VersionTable {
    dialect: Dialect,
}

impl VersionTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// True while no version has been written: the table is missing or empty.
    /// Must be asked before [`Table::create_table`] runs on a fresh database.
    pub fn is_new_database(&self, conn: &mut dyn Connection) -> Result<bool, StorageError> {
        if !schema::table_exists(conn, self.dialect, SCHEMA.name)? {
            return Ok(true);
        }
        Ok(self.get_version(conn)?.is_none())
    }

    /// Stored version, or `None` if none has been written.
    pub fn get_version(&self, conn: &mut dyn Connection) -> Result<Option<u32>, StorageError> {
        let row = conn.query_row("SELECT MAX(version) FROM plan_version", &[])?;
        match row {
            Some(row) => row
                .get_opt_i64(0)?
                .map(|v| {
                    u32::try_from(v)
                        .map_err(|_| StorageError::invalid_value(format!("bad schema version {v}")))
                })
                .transpose(),
            None => Ok(None),
        }
    }

    /// Replace the stored version. Runs inside the caller's unit of work.
    pub fn set_version(&self, conn: &mut dyn Connection, version: u32) -> Result<(), StorageError> {
        conn.execute("DELETE FROM plan_version", &[])?;
        conn.execute(
            "INSERT INTO plan_version (version) VALUES (?)",
            &sql_params![version],
        )?;
        Ok(())
    }
}

impl Table for VersionTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
