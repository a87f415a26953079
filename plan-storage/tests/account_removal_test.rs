//! Per-identity removal and full truncation across every table.

use std::collections::BTreeMap;
use std::sync::Arc;

use plan_core::diagnostics::test_helpers::{RecordingBenchmark, RecordingLogSink};
use plan_core::{Dialect, PlanConfig, StorageError};
use plan_storage::tables::actions::ActionRecord;
use plan_storage::tables::ips::GeoInfo;
use plan_storage::tables::kills::PlayerKill;
use plan_storage::tables::nicknames::Nickname;
use plan_storage::tables::security::WebUser;
use plan_storage::tables::server::ServerInfo;
use plan_storage::tables::sessions::SessionRecord;
use plan_storage::tables::world_times::WorldTime;
use plan_storage::{Connection, DatabaseEngine, Table};
use uuid::Uuid;

fn ready_engine() -> (DatabaseEngine, Arc<RecordingBenchmark>) {
    let bench = Arc::new(RecordingBenchmark::new());
    let engine = DatabaseEngine::sqlite(PlanConfig::default())
        .with_sinks(Arc::new(RecordingLogSink::new()), bench.clone());
    engine.init().unwrap();
    (engine, bench)
}

fn count(conn: &mut dyn Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), &[])
        .unwrap()
        .unwrap()
        .get_i64(0)
        .unwrap()
}

/// Registers `player` on the server with one session and a row in every
/// identity-keyed table. `victim` must already be registered.
fn seed_player(engine: &DatabaseEngine, server_id: i64, player: &Uuid, name: &str, victim: &Uuid) {
    engine
        .with_transaction(|conn| {
            let t = engine.tables();
            t.users.register_user(conn, player, 1_000, name)?;
            t.user_info.register_user_info(conn, player, 1_000, server_id)?;
            t.ips.save_geo_info(
                conn,
                player,
                &GeoInfo {
                    ip: "127.0.0.1".to_string(),
                    geolocation: "Local".to_string(),
                    last_used: 2_000,
                },
            )?;
            t.nicknames.save_nickname(
                conn,
                player,
                &Nickname {
                    name: format!("§a{name}"),
                    server_id,
                    last_used: 2_000,
                },
            )?;
            let session_id = t.sessions.save_session(
                conn,
                player,
                &SessionRecord {
                    id: None,
                    server_id,
                    start: 1_000,
                    end: 5_000,
                    mob_kills: 2,
                    deaths: 1,
                },
            )?;
            let mut kills = BTreeMap::new();
            kills.insert(
                session_id,
                vec![PlayerKill {
                    victim: *victim,
                    weapon: "Diamond Sword".to_string(),
                    date: 3_000,
                }],
            );
            t.kills.save_kills(conn, player, &kills)?;
            t.world.save_worlds(conn, ["world"])?;
            let mut times = BTreeMap::new();
            times.insert(
                session_id,
                vec![WorldTime {
                    world: "world".to_string(),
                    survival: 4_000,
                    creative: 0,
                    adventure: 0,
                    spectator: 0,
                }],
            );
            t.world_times.save_world_times(conn, player, server_id, &times)?;
            t.actions.insert_action(
                conn,
                player,
                &ActionRecord {
                    server_id,
                    action_id: 1,
                    date: 1_000,
                    additional_info: Some("First join".to_string()),
                },
            )?;
            Ok(())
        })
        .unwrap();
}

fn seed_server(engine: &DatabaseEngine) -> i64 {
    engine
        .with_transaction(|conn| {
            let t = engine.tables();
            let server_id = t.server.save_server_info(
                conn,
                &ServerInfo {
                    uuid: Uuid::new_v4(),
                    name: "Survival".to_string(),
                    web_address: Some("http://localhost:8804".to_string()),
                    max_players: 20,
                },
            )?;
            let mut commands = BTreeMap::new();
            commands.insert("/plan".to_string(), 3);
            t.command_use.add_command_use(conn, server_id, &commands)?;
            t.security.add_new_user(
                conn,
                &WebUser {
                    username: "admin".to_string(),
                    salted_pass_hash: "hash".to_string(),
                    permission_level: 0,
                },
            )?;
            Ok(server_id)
        })
        .unwrap()
}

#[test]
fn remove_account_clears_only_that_identity() {
    let (engine, bench) = ready_engine();
    let server_id = seed_server(&engine);
    let steve = Uuid::new_v4();
    let alex = Uuid::new_v4();
    engine
        .with_transaction(|conn| engine.tables().users.register_user(conn, &alex, 500, "Alex"))
        .unwrap();
    seed_player(&engine, server_id, &steve, "Steve", &alex);

    assert!(engine.was_seen_before(Some(&steve)));
    engine.remove_account(Some(&steve)).unwrap();
    assert!(!engine.was_seen_before(Some(&steve)));
    assert!(engine.was_seen_before(Some(&alex)));
    assert!(bench.stopped().iter().any(|(_, name)| name == "Remove Account"));

    engine
        .with_transaction(|conn| {
            let t = engine.tables();
            assert!(t.sessions.get_sessions(conn, &steve)?.is_empty());
            assert!(t.ips.get_geo_info(conn, &steve)?.is_empty());
            assert!(t.nicknames.get_nicknames(conn, &steve, None)?.is_empty());
            assert!(t.actions.get_actions(conn, &steve)?.is_empty());
            assert!(t.user_info.get_user_info(conn, &steve)?.is_empty());
            assert!(t.world_times.get_world_times(conn, &steve)?.is_empty());
            assert!(t.kills.get_player_kills(conn, &steve)?.is_empty());

            for table in ["plan_sessions", "plan_kills", "plan_world_times", "plan_ips", "plan_nicknames"] {
                assert_eq!(count(conn, table), 0, "{table} not cleared");
            }
            assert_eq!(count(conn, "plan_users"), 1);
            // Server-wide rows are untouched.
            assert_eq!(count(conn, "plan_servers"), 1);
            assert_eq!(count(conn, "plan_worlds"), 1);
            assert_eq!(count(conn, "plan_commandusages"), 1);
            assert_eq!(count(conn, "plan_security"), 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn removing_a_victim_also_removes_kills_against_them() {
    let (engine, _) = ready_engine();
    let server_id = seed_server(&engine);
    let killer = Uuid::new_v4();
    let victim = Uuid::new_v4();
    engine
        .with_transaction(|conn| engine.tables().users.register_user(conn, &victim, 500, "Victim"))
        .unwrap();
    seed_player(&engine, server_id, &killer, "Killer", &victim);

    engine.remove_account(Some(&victim)).unwrap();
    engine
        .with_transaction(|conn| {
            assert_eq!(count(conn, "plan_kills"), 0);
            assert_eq!(count(conn, "plan_sessions"), 1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn removing_unknown_or_absent_identity_is_noop() {
    let (engine, _) = ready_engine();
    let server_id = seed_server(&engine);
    let steve = Uuid::new_v4();
    let alex = Uuid::new_v4();
    engine
        .with_transaction(|conn| engine.tables().users.register_user(conn, &alex, 500, "Alex"))
        .unwrap();
    seed_player(&engine, server_id, &steve, "Steve", &alex);

    engine.remove_account(None).unwrap();
    engine.remove_account(Some(&Uuid::new_v4())).unwrap();
    assert!(engine.was_seen_before(Some(&steve)));

    // Second removal of the same identity finds nothing left.
    engine.remove_account(Some(&steve)).unwrap();
    engine.remove_account(Some(&steve)).unwrap();
    assert!(!engine.was_seen_before(Some(&steve)));
}

#[test]
fn remove_all_data_empties_every_table() {
    let (engine, bench) = ready_engine();
    let server_id = seed_server(&engine);
    let steve = Uuid::new_v4();
    let alex = Uuid::new_v4();
    engine
        .with_transaction(|conn| engine.tables().users.register_user(conn, &alex, 500, "Alex"))
        .unwrap();
    seed_player(&engine, server_id, &steve, "Steve", &alex);

    engine.remove_all_data().unwrap();
    assert!(bench.stopped().iter().any(|(_, name)| name == "Remove All Data"));

    engine
        .with_transaction(|conn| {
            for table in engine.tables().in_remove_order() {
                assert_eq!(count(conn, table.name()), 0, "{} not empty", table.name());
            }
            Ok(())
        })
        .unwrap();
    assert!(!engine.was_seen_before(Some(&alex)));
    // The schema version survives.
    assert!(engine.get_version().unwrap().is_some());
}

fn drop_table(engine: &DatabaseEngine, table: &str) {
    engine
        .with_transaction(|conn| conn.execute(&format!("DROP TABLE {table}"), &[]))
        .unwrap();
}

#[test]
fn failed_account_removal_keeps_earlier_tables_cleared() {
    let (engine, _) = ready_engine();
    let server_id = seed_server(&engine);
    let steve = Uuid::new_v4();
    let alex = Uuid::new_v4();
    engine
        .with_transaction(|conn| engine.tables().users.register_user(conn, &alex, 500, "Alex"))
        .unwrap();
    seed_player(&engine, server_id, &steve, "Steve", &alex);
    // plan_user_info comes after every per-session table in removal order.
    drop_table(&engine, "plan_user_info");

    assert!(engine.remove_account(Some(&steve)).is_err());

    engine
        .with_transaction(|conn| {
            for table in [
                "plan_ips",
                "plan_nicknames",
                "plan_kills",
                "plan_world_times",
                "plan_sessions",
                "plan_actions",
            ] {
                assert_eq!(count(conn, table), 0, "{table} removal was rolled back");
            }
            assert_eq!(count(conn, "plan_users"), 2);
            Ok(())
        })
        .unwrap();
    assert!(engine.was_seen_before(Some(&steve)));
}

#[test]
fn failed_truncation_keeps_earlier_tables_emptied() {
    let (engine, _) = ready_engine();
    let server_id = seed_server(&engine);
    let steve = Uuid::new_v4();
    let alex = Uuid::new_v4();
    engine
        .with_transaction(|conn| engine.tables().users.register_user(conn, &alex, 500, "Alex"))
        .unwrap();
    seed_player(&engine, server_id, &steve, "Steve", &alex);
    drop_table(&engine, "plan_actions");

    assert!(engine.remove_all_data().is_err());

    engine
        .with_transaction(|conn| {
            for table in ["plan_ips", "plan_nicknames", "plan_kills", "plan_world_times", "plan_sessions"] {
                assert_eq!(count(conn, table), 0, "{table} not emptied");
            }
            for (table, rows) in [
                ("plan_worlds", 1),
                ("plan_user_info", 1),
                ("plan_users", 2),
                ("plan_commandusages", 1),
                ("plan_security", 1),
                ("plan_servers", 1),
            ] {
                assert_eq!(count(conn, table), rows, "{table} should be untouched");
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn removal_requires_ready_engine() {
    let engine = DatabaseEngine::sqlite(PlanConfig::default());
    let err = engine.remove_account(Some(&Uuid::new_v4())).unwrap_err();
    assert!(matches!(err, StorageError::NotInitialized));

    engine.init().unwrap();
    engine.close().unwrap();
    let err = engine.remove_all_data().unwrap_err();
    assert!(matches!(err, StorageError::InvalidState { .. }));
}

#[test]
fn identity_tables_follow_removal_order() {
    let (engine, _) = ready_engine();
    let identity_tables: Vec<_> = engine
        .tables()
        .in_remove_order()
        .filter(|t| t.as_identity_table().is_some())
        .map(|t| t.name())
        .collect();
    assert_eq!(identity_tables.last(), Some(&"plan_users"));
    assert_eq!(identity_tables.len(), 8);
    assert_eq!(engine.dialect(), Dialect::Sqlite);
}
