//! plan_users: one row per player identity.

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use super::{IdentityTable, Table};
use crate::batch::split_into_batches;
use crate::connection::{Connection, Row};
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

/// Resolves a uuid parameter to its `plan_users.id`.
pub(crate) const USER_ID_SUBQUERY: &str = "(SELECT id FROM plan_users WHERE uuid = ?)";

const COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Id),
    Column::new("uuid", ColumnKind::Varchar(36)).unique(),
    Column::new("registered", ColumnKind::BigInt),
    Column::new("name", ColumnKind::Varchar(16)),
    Column::new("times_kicked", ColumnKind::Int)
        .default_value("0")
        .since(6),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_users",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uuid: Uuid,
    pub registered: i64,
    pub name: String,
    pub times_kicked: i32,
}

impl UserRecord {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            uuid: row.get_uuid(0)?,
            registered: row.get_i64(1)?,
            name: row.get_string(2)?,
            times_kicked: row.get_i32(3)?,
        })
    }
}

pub struct UsersTable {
    dialect: Dialect,
}

impl UsersTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn register_user(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        registered: i64,
        name: &str,
    ) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO plan_users (uuid, registered, name) VALUES (?, ?, ?)",
            &sql_params![uuid, registered, name],
        )?;
        Ok(())
    }

    pub fn is_registered(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<bool, StorageError> {
        conn.exists("SELECT 1 FROM plan_users WHERE uuid = ?", &sql_params![uuid])
    }

    pub fn get_user_id(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Option<i64>, StorageError> {
        conn.query_row("SELECT id FROM plan_users WHERE uuid = ?", &sql_params![uuid])?
            .map(|row| row.get_i64(0))
            .transpose()
    }

    pub fn get_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Option<UserRecord>, StorageError> {
        conn.query_row(
            "SELECT uuid, registered, name, times_kicked FROM plan_users WHERE uuid = ?",
            &sql_params![uuid],
        )?
        .map(|row| UserRecord::from_row(&row))
        .transpose()
    }

    pub fn update_name(&self, conn: &mut dyn Connection, uuid: &Uuid, name: &str) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE plan_users SET name = ? WHERE uuid = ?",
            &sql_params![name, uuid],
        )?;
        Ok(())
    }

    /// Increment the kick counter.
    pub fn kicked(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE plan_users SET times_kicked = times_kicked + 1 WHERE uuid = ?",
            &sql_params![uuid],
        )?;
        Ok(())
    }

    /// Kick count, 0 for unknown identities.
    pub fn get_times_kicked(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<i32, StorageError> {
        match conn.query_row(
            "SELECT times_kicked FROM plan_users WHERE uuid = ?",
            &sql_params![uuid],
        )? {
            Some(row) => row.get_i32(0),
            None => Ok(0),
        }
    }

    pub fn get_saved_uuids(&self, conn: &mut dyn Connection) -> Result<Vec<Uuid>, StorageError> {
        conn.query("SELECT uuid FROM plan_users ORDER BY id", &[])?
            .iter()
            .map(|row| row.get_uuid(0))
            .collect()
    }

    /// Bulk insert in bounded batches. Returns rows inserted.
    pub fn insert_users(&self, conn: &mut dyn Connection, users: &[UserRecord]) -> Result<usize, StorageError> {
        let mut inserted = 0;
        for batch in split_into_batches(users) {
            let rows: Vec<_> = batch
                .iter()
                .map(|u| sql_params![u.uuid, u.registered, &u.name, u.times_kicked])
                .collect();
            inserted += conn.execute_many(
                "INSERT INTO plan_users (uuid, registered, name, times_kicked) VALUES (?, ?, ?, ?)",
                &rows,
            )?;
        }
        Ok(inserted)
    }
}

impl Table for UsersTable {
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

impl IdentityTable for UsersTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute("DELETE FROM plan_users WHERE uuid = ?", &sql_params![uuid])
    }
}
