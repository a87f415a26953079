//! plan_tps: per-server performance samples.

use plan_core::errors::StorageError;
use plan_core::Dialect;

use super::Table;
use crate::batch::split_into_batches;
use crate::connection::{Connection, Row};
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("server_id", ColumnKind::Int),
    Column::new("date", ColumnKind::BigInt),
    Column::new("tps", ColumnKind::Double),
    Column::new("players_online", ColumnKind::Int),
    Column::new("cpu_usage", ColumnKind::Double),
    Column::new("ram_usage", ColumnKind::BigInt),
    Column::new("entities", ColumnKind::Int),
    Column::new("chunks_loaded", ColumnKind::Int),
    Column::new("free_disk_space", ColumnKind::BigInt)
        .default_value("-1")
        .since(8),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_tps",
    columns: COLUMNS,
};

const SELECT_COLUMNS: &str =
    "date, tps, players_online, cpu_usage, ram_usage, entities, chunks_loaded, free_disk_space";

/// One performance sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Tps {
    pub date: i64,
    pub tps: f64,
    pub players_online: i32,
    pub cpu_usage: f64,
    pub ram_usage: i64,
    pub entities: i32,
    pub chunks_loaded: i32,
    /// Megabytes; -1 when unknown.
    pub free_disk_space: i64,
}

impl Tps {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            date: row.get_i64(0)?,
            tps: row.get_f64(1)?,
            players_online: row.get_i32(2)?,
            cpu_usage: row.get_f64(3)?,
            ram_usage: row.get_i64(4)?,
            entities: row.get_i32(5)?,
            chunks_loaded: row.get_i32(6)?,
            free_disk_space: row.get_i64(7)?,
        })
    }

    fn params(&self, server_id: i64) -> Vec<crate::connection::SqlValue> {
        sql_params![
            server_id,
            self.date,
            self.tps,
            self.players_online,
            self.cpu_usage,
            self.ram_usage,
            self.entities,
            self.chunks_loaded,
            self.free_disk_space
        ]
    }
}

const INSERT_SQL: &str = "INSERT INTO plan_tps
    (server_id, date, tps, players_online, cpu_usage, ram_usage, entities, chunks_loaded, free_disk_space)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub struct TpsTable {
    dialect: Dialect,
}

impl TpsTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn insert_tps(&self, conn: &mut dyn Connection, server_id: i64, tps: &Tps) -> Result<(), StorageError> {
        conn.execute(INSERT_SQL, &tps.params(server_id))?;
        Ok(())
    }

    /// Bulk insert samples of many servers in bounded batches.
    pub fn insert_all(&self, conn: &mut dyn Connection, samples: &[(i64, Tps)]) -> Result<usize, StorageError> {
        let mut inserted = 0;
        for batch in split_into_batches(samples) {
            let rows: Vec<_> = batch.iter().map(|(server_id, tps)| tps.params(*server_id)).collect();
            inserted += conn.execute_many(INSERT_SQL, &rows)?;
        }
        Ok(inserted)
    }

    /// Samples of one server, oldest first.
    pub fn get_tps_data(&self, conn: &mut dyn Connection, server_id: i64) -> Result<Vec<Tps>, StorageError> {
        conn.query(
            &format!("SELECT {SELECT_COLUMNS} FROM plan_tps WHERE server_id = ? ORDER BY date"),
            &sql_params![server_id],
        )?
        .iter()
        .map(Tps::from_row)
        .collect()
    }

    /// The sample with the most players online, earliest on ties.
    pub fn get_all_time_peak(&self, conn: &mut dyn Connection, server_id: i64) -> Result<Option<Tps>, StorageError> {
        conn.query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM plan_tps WHERE server_id = ?
                 ORDER BY players_online DESC, date ASC LIMIT 1"
            ),
            &sql_params![server_id],
        )?
        .map(|row| Tps::from_row(&row))
        .transpose()
    }

    /// Delete samples older than `cutoff_ms`, keeping the all-time peak rows.
    ///
    /// The peak is read first because MySQL refuses a DELETE whose subquery
    /// reads the table being deleted from.
    pub fn clean(&self, conn: &mut dyn Connection, cutoff_ms: i64) -> Result<usize, StorageError> {
        let peak = conn
            .query_row("SELECT MAX(players_online) FROM plan_tps", &[])?
            .map(|row| row.get_opt_i64(0))
            .transpose()?
            .flatten();
        match peak {
            Some(peak) => conn.execute(
                "DELETE FROM plan_tps WHERE date < ? AND players_online != ?",
                &sql_params![cutoff_ms, peak],
            ),
            None => Ok(0),
        }
    }
}

impl Table for TpsTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
