//! plan_ips: addresses and geolocations a player has connected from.

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
    Column::new("ip", ColumnKind::Varchar(39)),
    Column::new("geolocation", ColumnKind::Varchar(50)),
    Column::new("last_used", ColumnKind::BigInt)
        .default_value("0")
        .since(7),
];

pub const SCHEMA: TableSchema = TableSchema {
    name: "plan_ips",
    columns: COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub ip: String,
    pub geolocation: String,
    pub last_used: i64,
}

pub struct IpsTable {
    dialect: Dialect,
}

impl IpsTable {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Insert the address, or refresh `last_used` if it is already known.
    pub fn save_geo_info(&self, conn: &mut dyn Connection, uuid: &Uuid, info: &GeoInfo) -> Result<(), StorageError> {
        let updated = conn.execute(
            &format!(
                "UPDATE plan_ips SET last_used = ?, geolocation = ? WHERE user_id = {USER_ID_SUBQUERY} AND ip = ?"
            ),
            &sql_params![info.last_used, &info.geolocation, uuid, &info.ip],
        )?;
        if updated == 0 {
            conn.execute(
                &format!(
                    "INSERT INTO plan_ips (user_id, ip, geolocation, last_used) VALUES ({USER_ID_SUBQUERY}, ?, ?, ?)"
                ),
                &sql_params![uuid, &info.ip, &info.geolocation, info.last_used],
            )?;
        }
        Ok(())
    }

    pub fn get_geo_info(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Vec<GeoInfo>, StorageError> {
        conn.query(
            &format!(
                "SELECT ip, geolocation, last_used FROM plan_ips
                 WHERE user_id = {USER_ID_SUBQUERY} ORDER BY last_used"
            ),
            &sql_params![uuid],
        )?
        .iter()
        .map(|row| {
            Ok(GeoInfo {
                ip: row.get_string(0)?,
                geolocation: row.get_string(1)?,
                last_used: row.get_i64(2)?,
            })
        })
        .collect()
    }

    pub fn get_ips(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<Vec<String>, StorageError> {
        Ok(self
            .get_geo_info(conn, uuid)?
            .into_iter()
            .map(|g| g.ip)
            .collect())
    }

    /// Bulk insert for many players in bounded batches. No duplicate check.
    pub fn insert_all(
        &self,
        conn: &mut dyn Connection,
        geo_info: &BTreeMap<Uuid, Vec<GeoInfo>>,
    ) -> Result<usize, StorageError> {
        let sql = format!(
            "INSERT INTO plan_ips (user_id, ip, geolocation, last_used) VALUES ({USER_ID_SUBQUERY}, ?, ?, ?)"
        );
        let flat = geo_info
            .iter()
            .flat_map(|(uuid, infos)| infos.iter().map(move |info| (uuid, info)));

        let mut inserted = 0;
        for batch in split_into_batches(flat) {
            let rows: Vec<_> = batch
                .iter()
                .map(|(uuid, info)| sql_params![*uuid, &info.ip, &info.geolocation, info.last_used])
                .collect();
            inserted += conn.execute_many(&sql, &rows)?;
        }
        Ok(inserted)
    }
}

impl Table for IpsTable {
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

impl IdentityTable for IpsTable {
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError> {
        conn.execute(
            &format!("DELETE FROM plan_ips WHERE user_id = {USER_ID_SUBQUERY}"),
            &sql_params![uuid],
        )
    }
}
