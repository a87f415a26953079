//! Bulk-write throughput: batch splitting alone, and batched inserts into an
//! in-memory SQLite sessions table.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uuid::Uuid;

use plan_core::Dialect;
use plan_storage::tables::sessions::SessionRecord;
use plan_storage::tables::{SessionsTable, Table, UsersTable};
use plan_storage::{split_into_batches, DataSource, SqliteDataSource};

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_into_batches");
    for n in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| split_into_batches(0..n))
        });
    }
    group.finish();
}

fn bench_insert_sessions(c: &mut Criterion) {
    let source = SqliteDataSource::open_in_memory().unwrap();
    let users = UsersTable::new(Dialect::Sqlite);
    let sessions = SessionsTable::new(Dialect::Sqlite);
    let player = Uuid::new_v4();
    {
        let mut conn = source.get_connection().unwrap();
        users.create_table(conn.as_mut()).unwrap();
        sessions.create_table(conn.as_mut()).unwrap();
        users.register_user(conn.as_mut(), &player, 0, "Bench").unwrap();
        conn.commit().unwrap();
        conn.close().unwrap();
    }

    let rows: Vec<_> = (0..5_000i64)
        .map(|i| {
            let session = SessionRecord {
                id: None,
                server_id: 1,
                start: i * 1_000,
                end: i * 1_000 + 500,
                mob_kills: 0,
                deaths: 0,
            };
            (player, session)
        })
        .collect();

    let mut group = c.benchmark_group("insert_sessions");
    group.throughput(Throughput::Elements(rows.len() as u64));
    group.sample_size(10);
    group.bench_function("5000_rows", |b| {
        b.iter(|| {
            let mut conn = source.get_connection().unwrap();
            sessions.insert_sessions(conn.as_mut(), &rows).unwrap();
            // Rolled back so every iteration starts from the same table.
            conn.rollback().unwrap();
            conn.close().unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_split, bench_insert_sessions);
criterion_main!(benches);
