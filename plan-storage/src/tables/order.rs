//! Creation and removal order for the entity tables.
//!
//! No foreign keys are enforced by the database. Removal subqueries resolve
//! player identities through `plan_users` and session ids through
//! `plan_sessions`, so a table must be cleared before every table it
//! references. [`TableId::references`] is the dependency graph;
//! [`REMOVAL_ORDER`] is checked against it in tests.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    Server,
    Users,
    UserInfo,
    Ips,
    Nicknames,
    Sessions,
    Kills,
    CommandUse,
    Actions,
    Tps,
    World,
    WorldTimes,
    Security,
}

impl TableId {
    /// Tables whose ids this table's rows point at.
    pub fn references(self) -> &'static [TableId] {
        use TableId::*;
        match self {
            Server | Users | World | Security => &[],
            UserInfo => &[Users, Server],
            Ips => &[Users],
            Nicknames => &[Users, Server],
            Sessions => &[Users, Server],
            Kills => &[Users, Sessions],
            CommandUse => &[Server],
            Actions => &[Users, Server],
            Tps => &[Server],
            WorldTimes => &[Users, World, Server, Sessions],
        }
    }

    /// Whether rows carry a player identity and support per-identity removal.
    pub fn is_identity_keyed(self) -> bool {
        use TableId::*;
        matches!(
            self,
            Users | UserInfo | Ips | Nicknames | Sessions | Kills | Actions | WorldTimes
        )
    }
}

pub static CREATION_ORDER: [TableId; 13] = [
    TableId::Server,
    TableId::Users,
    TableId::UserInfo,
    TableId::Ips,
    TableId::Nicknames,
    TableId::Sessions,
    TableId::Kills,
    TableId::CommandUse,
    TableId::Actions,
    TableId::Tps,
    TableId::World,
    TableId::WorldTimes,
    TableId::Security,
];

pub static REMOVAL_ORDER: [(TableId, &str); 13] = [
    (TableId::Ips, "leaf; keyed by user id"),
    (TableId::Nicknames, "leaf; keyed by user id"),
    (TableId::Kills, "detail rows of a session; keyed by killer and victim ids"),
    (TableId::WorldTimes, "detail rows of a session and a world"),
    (TableId::Sessions, "parent of kills and world times; keyed by user id"),
    (TableId::Actions, "leaf; keyed by user id"),
    (TableId::World, "referenced only by world times"),
    (TableId::UserInfo, "per-server registration of a user"),
    (TableId::Users, "identity rows every removal above resolves through"),
    (TableId::CommandUse, "server-wide counters"),
    (TableId::Tps, "server-wide samples"),
    (TableId::Security, "web users; no references"),
    (TableId::Server, "referenced by every per-server table above"),
];
