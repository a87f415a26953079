//! plan_user_info: per-server registration and op/ban flags of a player.

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use super::users::USER_ID_SUBQUERY;
use super::{IdentityTable, Table};
use crate::connection::Connection;
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("user_id", ColumnKind::Int),
    Column::new("registered", ColumnKind::BigInt),
    Column::new("opped", ColumnKind::Bool).default_value("0"),
    Column::new("banned", ColumnKind::Bool).default_value("0"),
    Column::new("server_id", ColumnKind::Int),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_user_info",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfoRecord {
    pub server_id: i64,
    pub registered: i64,
    pub opped: bool,
    pub banned: bool,
}

pub struct UserInfoTable {
    dialect: Dialect,
}

impl UserInfoTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn register_user_info(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        registered: i64,
        server_id: i64,
    ) -> Result<(), StorageError> {
        conn.execute(
            &format!(
                "INSERT INTO plan_user_info (user_id, registered, server_id) VALUES ({USER_ID_SUBQUERY}, ?, ?)"
            ),
            &sql_params![uuid, registered, server_id],
        )?;
        Ok(())
    }

    pub fn is_registered_on(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        server_id: i64,
    ) -> Result<bool, StorageError> {
        conn.exists(
            &format!("SELECT 1 FROM plan_user_info WHERE user_id = {USER_ID_SUBQUERY} AND server_id = ?"),
            &sql_params![uuid, server_id],
        )
    }

    pub fn update_op_and_ban(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        server_id: i64,
        opped: bool,
        banned: bool,
    ) -> Result<(), StorageError> {
        conn.execute(
            &format!(
                "UPDATE plan_user_info SET opped = ?, banned = ? WHERE user_id = {USER_ID_SUBQUERY} AND server_id = ?"
            ),
            &sql_params![opped, banned, uuid, server_id],
        )?;
        Ok(())
    }

    pub fn get_user_info(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Vec<UserInfoRecord>, StorageError> {
        conn.query(
            &format!(
                "SELECT server_id, registered, opped, banned FROM plan_user_info
                 WHERE user_id = {USER_ID_SUBQUERY} ORDER BY server_id"
            ),
            &sql_params![uuid],
        )?
        .iter()
        .map(|row| {
            Ok(UserInfoRecord {
                server_id: row.get_i64(0)?,
                registered: row.get_i64(1)?,
                opped: row.get_bool(2)?,
                banned: row.get_bool(3)?,
            })
        })
        .collect()
    }
}

impl Table for UserInfoTable {
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

impl IdentityTable for UserInfoTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!("DELETE FROM plan_user_info WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )
    }
}
