//! plan_kills: player kills, attached to the killer's session.

use std::collections::BTreeMap;

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use super::users::USER_ID_SUBQUERY;
use super::{IdentityTable, Table};
use crate::batch::split_into_batches_id;
use crate::connection::{Connection, Row};
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("killer_id", ColumnKind::Int),
    Column::new("victim_id", ColumnKind::Int),
    Column::new("weapon", ColumnKind::Varchar(30)),
    Column::new("date", ColumnKind::BigInt),
    Column::new("session_id", ColumnKind::Int),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_kills",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerKill {
    pub victim: Uuid,
    pub weapon: String,
    pub date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillRecord {
    pub session_id: i64,
    pub kill: PlayerKill,
}

impl KillRecord {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            session_id: row.get_i64(0)?,
            kill: PlayerKill {
                victim: row.get_uuid(1)?,
                weapon: row.get_string(2)?,
                date: row.get_i64(3)?,
            },
        })
    }
}

const SELECT_KILLS: &str = "SELECT k.session_id, v.uuid, k.weapon, k.date
     FROM plan_kills k JOIN plan_users v ON v.id = k.victim_id";

pub struct KillsTable {
    dialect: Dialect,
}

impl KillsTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Save `killer`'s kills grouped by session id. Each batch keeps the
    /// session id of every kill. Returns rows inserted.
    pub fn save_kills(
        &self,
        conn: &mut dyn Connection,
        killer: &Uuid,
        kills_by_session: &BTreeMap<i64, Vec<PlayerKill>>,
    ) -> Result<usize, StorageError> {
        let sql = format!(
            "INSERT INTO plan_kills (killer_id, victim_id, session_id, date, weapon)
             VALUES ({USER_ID_SUBQUERY}, {USER_ID_SUBQUERY}, ?, ?, ?)"
        );
        let grouped = kills_by_session.iter().map(|(id, kills)| (*id, kills));

        let mut inserted = 0;
        for batch in split_into_batches_id(grouped) {
            let rows: Vec<_> = batch
                .iter()
                .map(|c| sql_params![killer, c.value.victim, c.id, c.value.date, &c.value.weapon])
                .collect();
            inserted += conn.execute_many(&sql, &rows)?;
        }
        Ok(inserted)
    }

    pub fn get_player_kills(&self, conn: &mut dyn Connection, killer: &Uuid) -> Result<Vec<KillRecord>, StorageError> {
        conn.query(
            &format!("{SELECT_KILLS} WHERE k.killer_id = {USER_ID_SUBQUERY} ORDER BY k.date"),
            &sql_params![killer],
        )?
        .iter()
        .map(KillRecord::from_row)
        .collect()
    }

    pub fn get_session_kills(&self, conn: &mut dyn Connection, session_id: i64) -> Result<Vec<PlayerKill>, StorageError> {
        conn.query(
            &format!("{SELECT_KILLS} WHERE k.session_id = ? ORDER BY k.date"),
            &sql_params![session_id],
        )?
        .iter()
        .map(|row| KillRecord::from_row(row).map(|r| r.kill))
        .collect()
    }
}

impl Table for KillsTable {
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

impl IdentityTable for KillsTable {
    /// Removes kills where the identity is either killer or victim.
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!(
                "DELETE FROM plan_kills WHERE killer_id = {USER_ID_SUBQUERY} OR victim_id = {USER_ID_SUBQUERY}"
            ),
            &sql_params![uuid, uuid],
        )
    }
}
