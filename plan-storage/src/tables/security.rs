//! plan_security: web dashboard accounts. Not keyed by player identity.

use plan_core::errors::StorageError;
use plan_core::Dialect;

use super::Table;
use crate::connection::{Connection, Row};
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("username", ColumnKind::Varchar(100)).unique(),
    Column::new("salted_pass_hash", ColumnKind::Varchar(100)).unique(),
    Column::new("permission_level", ColumnKind::Int),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_security",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebUser {
    pub username: String,
    pub salted_pass_hash: String,
    pub permission_level: i32,
}

impl WebUser {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            username: row.get_string(0)?,
            salted_pass_hash: row.get_string(1)?,
            permission_level: row.get_i32(2)?,
        })
    }
}

pub struct SecurityTable {
    dialect: Dialect,
}

impl SecurityTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn add_new_user(&self, conn: &mut dyn Connection, user: &WebUser) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO plan_security (username, salted_pass_hash, permission_level) VALUES (?, ?, ?)",
            &sql_params![&user.username, &user.salted_pass_hash, user.permission_level],
        )?;
        Ok(())
    }

    pub fn get_web_user(&self, conn: &mut dyn Connection, username: &str) -> Result<Option<WebUser>, StorageError> {
        conn.query_row(
            "SELECT username, salted_pass_hash, permission_level FROM plan_security WHERE username = ?",
            &sql_params![username],
        )?
        .map(|row| WebUser::from_row(&row))
        .transpose()
    }

    pub fn user_exists(&self, conn: &mut dyn Connection, username: &str) -> Result<bool, StorageError> {
        conn.exists("SELECT 1 FROM plan_security WHERE username = ?", &sql_params![username])
    }

    pub fn get_users(&self, conn: &mut dyn Connection) -> Result<Vec<WebUser>, StorageError> {
        conn.query(
            "SELECT username, salted_pass_hash, permission_level FROM plan_security ORDER BY username",
            &[],
        )?
        .iter()
        .map(WebUser::from_row)
        .collect()
    }

    /// Returns whether a user was removed.
    pub fn remove_web_user(&self, conn: &mut dyn Connection, username: &str) -> Result<bool, StorageError> {
        let removed = conn.execute("DELETE FROM plan_security WHERE username = ?", &sql_params![username])?;
        Ok(removed > 0)
    }
}

impl Table for SecurityTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
