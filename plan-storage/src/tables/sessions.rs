//! plan_sessions: one row per play session.

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
    Column::new("id", ColumnKind::Id),
    Column::new("user_id", ColumnKind::Int),
    Column::new("server_id", ColumnKind::Int),
    Column::new("session_start", ColumnKind::BigInt),
    Column::new("session_end", ColumnKind::BigInt),
    Column::new("mob_kills", ColumnKind::Int).default_value("0"),
    Column::new("deaths", ColumnKind::Int).default_value("0"),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_sessions",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Database id; `None` until saved.
    pub id: Option<i64>,
    pub server_id: i64,
    pub start: i64,
    pub end: i64,
    pub mob_kills: i32,
    pub deaths: i32,
}

impl SessionRecord {
    pub fn length(&self) -> i64 {
        self.end - self.start
    }
}

pub struct SessionsTable {
    dialect: Dialect,
}

impl SessionsTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Insert a finished session. Returns its id.
    pub fn save_session(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        session: &SessionRecord,
    ) -> Result<i64, StorageError> {
        conn.execute(
            &format!(
                "INSERT INTO plan_sessions (user_id, server_id, session_start, session_end, mob_kills, deaths)
                 VALUES ({USER_ID_SUBQUERY}, ?, ?, ?, ?, ?)"
            ),
            &sql_params![
                uuid,
                session.server_id,
                session.start,
                session.end,
                session.mob_kills,
                session.deaths
            ],
        )?;
        self.get_session_id(conn, uuid, session)?
            .ok_or_else(|| StorageError::sql(format!("session of {uuid} missing after insert")))
    }

    fn get_session_id(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        session: &SessionRecord,
    ) -> Result<Option<i64>, StorageError> {
        conn.query_row(
            &format!(
                "SELECT MAX(id) FROM plan_sessions
                 WHERE user_id = {USER_ID_SUBQUERY} AND server_id = ? AND session_start = ? AND session_end = ?"
            ),
            &sql_params![uuid, session.server_id, session.start, session.end],
        )?
        .map(|row| row.get_opt_i64(0))
        .transpose()
        .map(Option::flatten)
    }

    /// Bulk insert sessions of many players in bounded batches.
    pub fn insert_sessions(
        &self,
        conn: &mut dyn Connection,
        sessions: &[(Uuid, SessionRecord)],
    ) -> Result<usize, StorageError> {
        let sql = format!(
            "INSERT INTO plan_sessions (user_id, server_id, session_start, session_end, mob_kills, deaths)
             VALUES ({USER_ID_SUBQUERY}, ?, ?, ?, ?, ?)"
        );
        let mut inserted = 0;
        for batch in split_into_batches(sessions) {
            let rows: Vec<_> = batch
                .iter()
                .map(|(uuid, s)| sql_params![uuid, s.server_id, s.start, s.end, s.mob_kills, s.deaths])
                .collect();
            inserted += conn.execute_many(&sql, &rows)?;
        }
        Ok(inserted)
    }

    pub fn get_sessions(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Vec<SessionRecord>, StorageError> {
        conn.query(
            &format!(
                "SELECT id, server_id, session_start, session_end, mob_kills, deaths FROM plan_sessions
                 WHERE user_id = {USER_ID_SUBQUERY} ORDER BY session_start"
            ),
            &sql_params![uuid],
        )?
        .iter()
        .map(|row| {
            Ok(SessionRecord {
                id: Some(row.get_i64(0)?),
                server_id: row.get_i64(1)?,
                start: row.get_i64(2)?,
                end: row.get_i64(3)?,
                mob_kills: row.get_i32(4)?,
                deaths: row.get_i32(5)?,
            })
        })
        .collect()
    }

    /// Total session length in milliseconds, optionally on one server.
    pub fn get_playtime(
        &self,
        conn: &mut dyn Connection,
        uuid: &Uuid,
        server_id: Option<i64>,
    ) -> Result<i64, StorageError> {
        let row = match server_id {
            Some(server_id) => conn.query_row(
                &format!(
                    "SELECT SUM(session_end - session_start) FROM plan_sessions
                     WHERE user_id = {USER_ID_SUBQUERY} AND server_id = ?"
                ),
                &sql_params![uuid, server_id],
            )?,
            None => conn.query_row(
                &format!(
                    "SELECT SUM(session_end - session_start) FROM plan_sessions
                     WHERE user_id = {USER_ID_SUBQUERY}"
                ),
                &sql_params![uuid],
            )?,
        };
        Ok(row.map(|r| r.get_opt_i64(0)).transpose()?.flatten().unwrap_or(0))
    }

    pub fn get_session_count(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<i64, StorageError> {
        match conn.query_row(
            &format!("SELECT COUNT(*) FROM plan_sessions WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )? {
            Some(row) => row.get_i64(0),
            None => Ok(0),
        }
    }
}

impl Table for SessionsTable {
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

impl IdentityTable for SessionsTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!("DELETE FROM plan_sessions WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )
    }
}
