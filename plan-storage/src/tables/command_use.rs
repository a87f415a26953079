//! plan_commandusages: per-server command counters.

use std::collections::BTreeMap;

use plan_core::errors::StorageError;
use plan_core::Dialect;

use super::Table;
use crate::batch::split_into_batches;
use crate::connection::Connection;
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

/// Commands longer than the column are not counted.
pub const MAX_COMMAND_LENGTH: usize = 20;

const COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Id),
    Column::new("command", ColumnKind::Varchar(MAX_COMMAND_LENGTH as u16)),
    Column::new("times_used", ColumnKind::Int),
    Column::new("server_id", ColumnKind::Int),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_commandusages",
    columns: COLUMNS,
};

pub struct CommandUseTable {
    dialect: Dialect,
}

impl CommandUseTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn get_command_use(&self, conn: &mut dyn Connection, server_id: i64) -> Result<BTreeMap<String, i64>, StorageError> {
        conn.query(
            "SELECT command, times_used FROM plan_commandusages WHERE server_id = ?",
            &sql_params![server_id],
        )?
        .iter()
        .map(|row| Ok((row.get_string(0)?, row.get_i64(1)?)))
        .collect()
    }

    /// Count one use of `command`.
    pub fn command_used(&self, conn: &mut dyn Connection, server_id: i64, command: &str) -> Result<(), StorageError> {
        let mut counts = BTreeMap::new();
        counts.insert(command.to_string(), 1);
        self.add_command_use(conn, server_id, &counts)?;
        Ok(())
    }

    /// Add `counts` to the stored counters: known commands are incremented,
    /// new ones inserted, both in bounded batches. Returns rows touched.
    pub fn add_command_use(
        &self,
        conn: &mut dyn Connection,
        server_id: i64,
        counts: &BTreeMap<String, i64>,
    ) -> Result<usize, StorageError> {
        let existing = self.get_command_use(conn, server_id)?;
        let (known, new): (Vec<_>, Vec<_>) = counts
            .iter()
            .filter(|(command, _)| command.chars().count() <= MAX_COMMAND_LENGTH)
            .partition(|(command, _)| existing.contains_key(command.as_str()));

        let mut touched = 0;
        for batch in split_into_batches(known) {
            let rows: Vec<_> = batch
                .iter()
                .map(|(command, times)| sql_params![**times, command.as_str(), server_id])
                .collect();
            touched += conn.execute_many(
                "UPDATE plan_commandusages SET times_used = times_used + ? WHERE command = ? AND server_id = ?",
                &rows,
            )?;
        }
        for batch in split_into_batches(new) {
            let rows: Vec<_> = batch
                .iter()
                .map(|(command, times)| sql_params![command.as_str(), **times, server_id])
                .collect();
            touched += conn.execute_many(
                "INSERT INTO plan_commandusages (command, times_used, server_id) VALUES (?, ?, ?)",
                &rows,
            )?;
        }
        Ok(touched)
    }
}

impl Table for CommandUseTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
