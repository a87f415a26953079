//! plan_world_times: per-session time spent in each world, split by game mode.

use std::collections::BTreeMap;

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use super::users::USER_ID_SUBQUERY;
use super::{IdentityTable, Table};
use crate::batch::split_into_batches_id;
use crate::connection::Connection;
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("user_id", ColumnKind::Int),
    Column::new("world_id", ColumnKind::Int),
    Column::new("server_id", ColumnKind::Int),
    Column::new("session_id", ColumnKind::Int),
    Column::new("survival_time", ColumnKind::BigInt).default_value("0"),
    Column::new("creative_time", ColumnKind::BigInt).default_value("0"),
    Column::new("adventure_time", ColumnKind::BigInt).default_value("0"),
    Column::new("spectator_time", ColumnKind::BigInt).default_value("0"),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_world_times",
    columns: COLUMNS,
};

/// Milliseconds spent in one world during one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldTime {
    pub world: String,
    pub survival: i64,
    pub creative: i64,
    pub adventure: i64,
    pub spectator: i64,
}

impl WorldTime {
    pub fn total(&self) -> i64 {
        self.survival + self.creative + self.adventure + self.spectator
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldTimeRecord {
    pub session_id: i64,
    pub server_id: i64,
    pub time: WorldTime,
}

pub struct WorldTimesTable {
    dialect: Dialect,
}

impl WorldTimesTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Save world times keyed by session id. World names must already be
    /// stored in plan_worlds; rows for unknown worlds are skipped by the
    /// insert-select.
    pub fn save_world_times(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        server_id: i64,
        times: &BTreeMap<i64, Vec<WorldTime>>,
    ) -> Result<usize, StorageError> {
        let sql = format!(
            "INSERT INTO plan_world_times
                (user_id, world_id, server_id, session_id, survival_time, creative_time, adventure_time, spectator_time)
             SELECT {USER_ID_SUBQUERY}, w.id, ?, ?, ?, ?, ?, ?
             FROM plan_worlds w WHERE w.world_name = ?"
        );
        let mut inserted = 0;
        for batch in split_into_batches_id(times.iter().map(|(id, list)| (*id, list))) {
            let rows: Vec<_> = batch
                .iter()
                .map(|c| {
                    let t = c.value;
                    sql_params![
                        uuid,
                        server_id,
                        c.id,
                        t.survival,
                        t.creative,
                        t.adventure,
                        t.spectator,
                        t.world.as_str()
                    ]
                })
                .collect();
            inserted += conn.execute_many(&sql, &rows)?;
        }
        Ok(inserted)
    }

    pub fn get_world_times(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Vec<WorldTimeRecord>, StorageError> {
        conn.query(
            &format!(
                "SELECT t.session_id, t.server_id, w.world_name,
                        t.survival_time, t.creative_time, t.adventure_time, t.spectator_time
                 FROM plan_world_times t
                 JOIN plan_worlds w ON w.id = t.world_id
                 WHERE t.user_id = {USER_ID_SUBQUERY}
                 ORDER BY t.session_id, w.world_name"
            ),
            &sql_params![uuid],
        )?
        .iter()
        .map(|row| {
            Ok(WorldTimeRecord {
                session_id: row.get_i64(0)?,
                server_id: row.get_i64(1)?,
                time: WorldTime {
                    world: row.get_string(2)?,
                    survival: row.get_i64(3)?,
                    creative: row.get_i64(4)?,
                    adventure: row.get_i64(5)?,
                    spectator: row.get_i64(6)?,
                },
            })
        })
        .collect()
    }
}

impl Table for WorldTimesTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn as_identity_table(&self) -> Option<&dyn IdentityTable> {
        Some(self)
    }
}

impl IdentityTable for WorldTimesTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!("DELETE FROM plan_world_times WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )
    }
}
