//! plan_nicknames: display names a player has used, per server.

use std::collections::BTreeMap;

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use super::users::USER_ID_SUBQUERY;
use super::{IdentityTable, Table};
use crate::batch::split_into_batches;
use crate::connection::Connection;
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("user_id", ColumnKind::Int),
    Column::new("nickname", ColumnKind::Varchar(75)),
    Column::new("server_id", ColumnKind::Int),
    Column::new("last_used", ColumnKind::BigInt)
        .default_value("0")
        .since(7),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_nicknames",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nickname {
    pub name: String,
    pub server_id: i64,
    pub last_used: i64,
}

pub struct NicknamesTable {
    dialect: Dialect,
}

impl NicknamesTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Insert the nickname, or refresh `last_used` if already saved for that server.
    pub fn save_nickname(&self, conn: &mut dyn Connection, uuid: &Uuid, nickname: &Nickname) -> Result<(), StorageError> {
        let updated = conn.execute(
            &format!(
                "UPDATE plan_nicknames SET last_used = ?
                 WHERE user_id = {USER_ID_SUBQUERY} AND server_id = ? AND nickname = ?"
            ),
            &sql_params![nickname.last_used, uuid, nickname.server_id, &nickname.name],
        )?;
        if updated == 0 {
            conn.execute(
                &format!(
                    "INSERT INTO plan_nicknames (user_id, nickname, server_id, last_used)
                     VALUES ({USER_ID_SUBQUERY}, ?, ?, ?)"
                ),
                &sql_params![uuid, &nickname.name, nickname.server_id, nickname.last_used],
            )?;
        }
        Ok(())
    }

    /// Nicknames in the order they were last used, optionally on one server.
    pub fn get_nicknames(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        server_id: Option<i64>,
    ) -> Result<Vec<Nickname>, StorageError> {
        let rows = match server_id {
            Some(server_id) => conn.query(
                &format!(
                    "SELECT nickname, server_id, last_used FROM plan_nicknames
                     WHERE user_id = {USER_ID_SUBQUERY} AND server_id = ? ORDER BY last_used"
                ),
                &sql_params![uuid, server_id],
            )?,
            None => conn.query(
                &format!(
                    "SELECT nickname, server_id, last_used FROM plan_nicknames
                     WHERE user_id = {USER_ID_SUBQUERY} ORDER BY last_used"
                ),
                &sql_params![uuid],
            )?,
        };
        rows.iter()
            .map(|row| {
                Ok(Nickname {
                    name: row.get_string(0)?,
                    server_id: row.get_i64(1)?,
                    last_used: row.get_i64(2)?,
                })
            })
            .collect()
    }

    /// Bulk insert for many players in bounded batches. No duplicate check.
    pub fn insert_all(
        &self,
        conn: &mut dyn Connection,
        nicknames: &BTreeMap<Uuid, Vec<Nickname>>,
    ) -> Result<usize, StorageError> {
        let sql = format!(
            "INSERT INTO plan_nicknames (user_id, nickname, server_id, last_used)
             VALUES ({USER_ID_SUBQUERY}, ?, ?, ?)"
        );
        let flat = nicknames
            .iter()
            .flat_map(|(uuid, names)| names.iter().map(move |n| (uuid, n)));

        let mut inserted = 0;
        for batch in split_into_batches(flat) {
            let rows: Vec<_> = batch
                .iter()
                .map(|(uuid, n)| sql_params![*uuid, &n.name, n.server_id, n.last_used])
                .collect();
            inserted += conn.execute_many(&sql, &rows)?;
        }
        Ok(inserted)
    }
}

impl Table for NicknamesTable {
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

impl IdentityTable for NicknamesTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!("DELETE FROM plan_nicknames WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )
    }
}
