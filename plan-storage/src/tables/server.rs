//! plan_servers: every game server that has written to this database.

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use super::Table;
use crate::connection::{Connection, Row};
use crate::schema::{Column, ColumnKind, TableSchema};
use crate::sql_params;

const COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Id),
    Column::new("uuid", ColumnKind::Varchar(36)).unique(),
    Column::new("name", ColumnKind::Varchar(100)),
    Column::new("web_address", ColumnKind::Varchar(100)).nullable(),
    Column::new("is_installed", ColumnKind::Bool).default_value("1"),
    Column::new("max_players", ColumnKind::Int)
        .default_value("-1")
        .since(8),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_servers",
    columns: COLUMNS,
};

/// Server details as reported by the running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub uuid: Uuid,
    pub name: String,
    pub web_address: Option<String>,
    pub max_players: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub web_address: Option<String>,
    pub installed: bool,
    pub max_players: i32,
}

impl ServerRecord {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.get_i64(0)?,
            uuid: row.get_uuid(1)?,
            name: row.get_string(2)?,
            web_address: row.get_opt_string(3)?,
            installed: row.get_bool(4)?,
            max_players: row.get_i32(5)?,
        })
    }
}

const SELECT_SERVERS: &str =
    "SELECT id, uuid, name, web_address, is_installed, max_players FROM plan_servers";

pub struct ServerTable {
    dialect: Dialect,
}

impl ServerTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Insert or update the row for `info.uuid`. Returns the server id.
    pub fn save_server_info(&self, conn: &mut dyn Connection, info: &ServerInfo) -> Result<i64, StorageError> {
        if let Some(id) = self.get_server_id(conn, &info.uuid)? {
            conn.execute(
                "UPDATE plan_servers SET name = ?, web_address = ?, is_installed = ?, max_players = ?
                 WHERE id = ?",
                &sql_params![&info.name, info.web_address.as_deref(), true, info.max_players, id],
            )?;
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO plan_servers (uuid, name, web_address, is_installed, max_players)
             VALUES (?, ?, ?, ?, ?)",
            &sql_params![info.uuid, &info.name, info.web_address.as_deref(), true, info.max_players],
        )?;
        self.get_server_id(conn, &info.uuid)?
            .ok_or_else(|| StorageError::sql(format!("server {} missing after insert", info.uuid)))
    }

    pub fn get_server_id(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Option<i64>, StorageError> {
        conn.query_row("SELECT id FROM plan_servers WHERE uuid = ?", &sql_params![uuid])?
            .map(|row| row.get_i64(0))
            .transpose()
    }

    pub fn get_server_name(&self, conn: &mut dyn Connection, id: i64) -> Result<Option<String>, StorageError> {
        conn.query_row("SELECT name FROM plan_servers WHERE id = ?", &sql_params![id])?
            .map(|row| row.get_string(0))
            .transpose()
    }

    pub fn get_server(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Option<ServerRecord>, StorageError> {
        conn.query_row(&format!("{SELECT_SERVERS} WHERE uuid = ?"), &sql_params![uuid])?
            .map(|row| ServerRecord::from_row(&row))
            .transpose()
    }

    pub fn get_servers(&self, conn: &mut dyn Connection) -> Result<Vec<ServerRecord>, StorageError> {
        conn.query(&format!("{SELECT_SERVERS} ORDER BY id"), &[])?
            .iter()
            .map(ServerRecord::from_row)
            .collect()
    }

    /// Mark a server as uninstalled. Its data stays.
    pub fn set_installed(&self, conn: &mut dyn Connection, uuid: &Uuid, installed: bool) -> Result<(), StorageError> {
        conn.execute(
            "UPDATE plan_servers SET is_installed = ? WHERE uuid = ?",
            &sql_params![installed, uuid],
        )?;
        Ok(())
    }
}

impl Table for ServerTable {
    fn schema(&self) -> &'static TableSchema {
        &SCHEMA
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
