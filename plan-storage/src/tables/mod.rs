//! Per-entity tables.
//!
//! Every table implements [`Table`] (create + truncate). Tables whose rows
//! are keyed by a player identity also implement [`IdentityTable`] and expose
//! it through [`Table::as_identity_table`].

pub mod actions;
pub mod command_use;
pub mod ips;
pub mod kills;
pub mod nicknames;
pub mod order;
pub mod security;
pub mod server;
pub mod sessions;
pub mod tps;
pub mod user_info;
pub mod users;
pub mod version;
pub mod world;
pub mod world_times;

use plan_core::errors::StorageError;
use plan_core::Dialect;
use uuid::Uuid;

use crate::connection::Connection;
use crate::schema::{self, TableSchema};

pub use actions::ActionsTable;
pub use command_use::CommandUseTable;
pub use ips::IpsTable;
pub use kills::KillsTable;
pub use nicknames::NicknamesTable;
pub use order::{TableId, CREATION_ORDER, REMOVAL_ORDER};
pub use security::SecurityTable;
pub use server::ServerTable;
pub use sessions::SessionsTable;
pub use tps::TpsTable;
pub use user_info::UserInfoTable;
pub use users::UsersTable;
pub use version::VersionTable;
pub use world::WorldTable;
pub use world_times::WorldTimesTable;

/// One logical table: owns its DDL and its data.
pub trait Table: Send + Sync {
    fn schema(&self) -> &'static TableSchema;

    fn dialect(&self) -> Dialect;

    fn name(&self) -> &'static str {
        self.schema().name
    }

    /// Create the table, or add the columns it is missing. Idempotent.
    fn create_table(&self, conn: &mut dyn Connection) -> Result<(), StorageError> {
        schema::ensure_table(conn, self.dialect(), self.schema())?;
        Ok(())
    }

    /// Delete every row.
    fn remove_all_data(&self, conn: &mut dyn Connection) -> Result<(), StorageError> {
        conn.execute(&format!("DELETE FROM {}", self.name()), &[])?;
        Ok(())
    }

    fn as_identity_table(&self) -> Option<&dyn IdentityTable> {
        None
    }
}

/// A table holding rows that belong to one player identity.
pub trait IdentityTable {
    /// Delete the identity's rows. Removing an identity with no rows is a no-op.
    fn remove_user(&self, conn: &mut dyn Connection, uuid: &Uuid) -> Result<usize, StorageError>;
}

/// Every entity table, owned by the engine.
pub struct Tables {
    pub server: ServerTable,
    pub users: UsersTable,
    pub user_info: UserInfoTable,
    pub ips: IpsTable,
    pub nicknames: NicknamesTable,
    pub sessions: SessionsTable,
    pub kills: KillsTable,
    pub command_use: CommandUseTable,
    pub actions: ActionsTable,
    pub tps: TpsTable,
    pub world: WorldTable,
    pub world_times: WorldTimesTable,
    pub security: SecurityTable,
}

impl Tables {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            server: ServerTable::new(dialect),
            users: UsersTable::new(dialect),
            user_info: UserInfoTable::new(dialect),
            ips: IpsTable::new(dialect),
            nicknames: NicknamesTable::new(dialect),
            sessions: SessionsTable::new(dialect),
            kills: KillsTable::new(dialect),
            command_use: CommandUseTable::new(dialect),
            actions: ActionsTable::new(dialect),
            tps: TpsTable::new(dialect),
            world: WorldTable::new(dialect),
            world_times: WorldTimesTable::new(dialect),
            security: SecurityTable::new(dialect),
        }
    }

    pub fn get(&self, id: TableId) -> &dyn Table {
        match id {
            TableId::Server => &self.server,
            TableId::Users => &self.users,
            TableId::UserInfo => &self.user_info,
            TableId::Ips => &self.ips,
            TableId::Nicknames => &self.nicknames,
            TableId::Sessions => &self.sessions,
            TableId::Kills => &self.kills,
            TableId::CommandUse => &self.command_use,
            TableId::Actions => &self.actions,
            TableId::Tps => &self.tps,
            TableId::World => &self.world,
            TableId::WorldTimes => &self.world_times,
            TableId::Security => &self.security,
        }
    }

    /// Tables in creation order.
    pub fn all(&self) -> impl Iterator<Item = &dyn Table> + '_ {
        CREATION_ORDER.iter().map(move |id| self.get(*id))
    }

    /// Tables in removal order.
    pub fn in_remove_order(&self) -> impl Iterator<Item = &dyn Table> + '_ {
        REMOVAL_ORDER.iter().map(move |(id, _)| self.get(*id))
    }
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
