//! plan_worlds: world names, referenced by world times.

use plan_core::errors::StorageError;
use plan_core::Dialect;

use super::Table;
use crate::batch::split_into_batches;
use crate::connection::Connection;
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Id),
    Column::new("world_name", ColumnKind::Varchar(100)).unique(),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_worlds",
    columns: COLUMNS,
};

pub struct WorldTable {
    dialect: Dialect,
}

impl WorldTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Insert the names not stored yet. Returns how many were added.
    pub fn save_worlds<'a, I>(&self, conn: &mut dyn Connection, names: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut known = self.get_worlds(conn)?;
        let mut missing = Vec::new();
        for name in names {
            if !known.iter().any(|k| k == name) {
                known.push(name.to_string());
                missing.push(name);
            }
        }
        let mut inserted = 0;
        for batch in split_into_batches(missing) {
            let rows: Vec<_> = batch.iter().map(|name| sql_params![*name]).collect();
            inserted += conn.execute_many("INSERT INTO plan_worlds (world_name) VALUES (?)", &rows)?;
        }
        Ok(inserted)
    }

    pub fn get_worlds(&self, conn: &mut dyn Connection) -> Result<Vec<String>, StorageError> {
        conn.query("SELECT world_name FROM plan_worlds ORDER BY id", &[])?
            .iter()
            .map(|row| row.get_string(0))
            .collect()
    }

    pub fn get_world_id(&self, conn: &mut dyn Connection, name: &str) -> Result<Option<i64>, StorageError> {
        conn.query_row("SELECT id FROM plan_worlds WHERE world_name = ?", &sql_params![name])?
            .map(|row| row.get_i64(0))
            .transpose()
    }
}

impl Table for WorldTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
