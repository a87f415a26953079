//! plan_actions: notable player events (first join, name change, kick).

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
    Column::new("server_id", ColumnKind::Int),
    Column::new("action_id", ColumnKind::Int),
    Column::new("date", ColumnKind::BigInt),
    Column::new("additional_info", ColumnKind::Varchar(300)).nullable(),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_actions",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub server_id: i64,
    pub action_id: i32,
    pub date: i64,
    pub additional_info: Option<String>,
}

pub struct ActionsTable {
    dialect: Dialect,
}

impl ActionsTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn insert_action(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        action: &ActionRecord,
    ) -> Result<(), StorageError> {
        conn.execute(
            &format!(
                "INSERT INTO plan_actions (user_id, server_id, action_id, date, additional_info)
                 VALUES ({USER_ID_SUBQUERY}, ?, ?, ?, ?)"
            ),
            &sql_params![
                uuid,
                action.server_id,
                action.action_id,
                action.date,
                action.additional_info.as_deref()
            ],
        )?;
        Ok(())
    }

    pub fn get_actions(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Vec<ActionRecord>, StorageError> {
        conn.query(
            &format!(
                "SELECT server_id, action_id, date, additional_info FROM plan_actions
                 WHERE user_id = {USER_ID_SUBQUERY} ORDER BY date"
            ),
            &sql_params![uuid],
        )?
        .iter()
        .map(|row| {
            Ok(ActionRecord {
                server_id: row.get_i64(0)?,
                action_id: row.get_i32(1)?,
                date: row.get_i64(2)?,
                additional_info: row.get_opt_string(3)?,
            })
        })
        .collect()
    }
}

impl Table for ActionsTable {
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

impl IdentityTable for ActionsTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!("DELETE FROM plan_actions WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )
    }
}
