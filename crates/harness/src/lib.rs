pub mod client;
pub mod remote;

pub use client::TestClient;
pub use remote::TestSnapshotSource;

use tracing_subscriber::EnvFilter;

/// Opt-in log output for test runs, driven by `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a SQLite database image containing the given master points.
pub fn snapshot_image(points: &[(&str, &str)]) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snapshot.db");
    {
        let conn = rusqlite::Connection::open(&path).expect("open snapshot db");
        conn.execute_batch(
            "CREATE TABLE master_points (id TEXT PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE master_creatures (id TEXT PRIMARY KEY, name TEXT NOT NULL);",
        )
        .expect("create snapshot schema");
        for (id, name) in points {
            conn.execute(
                "INSERT INTO master_points (id, name) VALUES (?1, ?2)",
                rusqlite::params![id, name],
            )
            .expect("insert point");
        }
    }
    std::fs::read(&path).expect("read snapshot image")
}

/// Gzip-compress a payload the way the snapshot publisher does.
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}
