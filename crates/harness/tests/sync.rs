use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use divesync_core::MASTER_DB_NAME;
use divesync_engine::{
    FileDatabase, PrefsStore, RemoteMetadata, SnapshotSource, SyncConfig, SyncEngine, SyncError,
    SyncState,
};
use divesync_harness::{TestClient, TestSnapshotSource, gzip, snapshot_image};
use divesync_storage::MasterStore;

const MARKER_JAN: &str = "2024-01-01T00:00:00Z";
const MARKER_FEB: &str = "2024-02-01T00:00:00Z";

fn seeded_remote() -> Arc<TestSnapshotSource> {
    Arc::new(TestSnapshotSource::new(
        MARKER_JAN,
        gzip(&snapshot_image(&[("p1", "Blue Corner")])),
    ))
}

fn point_names(client: &TestClient) -> Vec<String> {
    let mut store = client.open_store();
    store
        .query_all("SELECT name FROM master_points ORDER BY id", &[])
        .unwrap()
        .iter()
        .filter_map(|r| r.text("name").map(str::to_string))
        .collect()
}

#[test]
fn first_sync_installs_snapshot() {
    divesync_harness::init_logging();
    let client = TestClient::file(seeded_remote());

    assert!(!client.db_present());
    assert!(client.engine.sync_if_needed(false));
    assert!(client.db_present());
    assert_eq!(point_names(&client), vec!["Blue Corner"]);

    let record = client.prefs().read().unwrap();
    assert_eq!(record.last_synced_marker.as_deref(), Some(MARKER_JAN));
    assert_eq!(
        record.engine_version.as_deref(),
        Some(divesync_core::ENGINE_VERSION)
    );
    assert_eq!(client.remote.fetch_calls(), 1);
}

#[test]
fn up_to_date_skips_download() {
    let client = TestClient::file(seeded_remote());
    assert!(client.engine.sync_if_needed(false));

    assert!(!client.engine.sync_if_needed(false));
    assert_eq!(client.remote.metadata_calls(), 2);
    assert_eq!(client.remote.fetch_calls(), 1);
}

#[test]
fn new_marker_triggers_resync() {
    let client = TestClient::file(seeded_remote());
    assert!(client.engine.sync_if_needed(false));

    client.remote.publish(
        MARKER_FEB,
        gzip(&snapshot_image(&[("p1", "Blue Corner"), ("p2", "Manta Point")])),
    );
    assert!(client.engine.sync_if_needed(false));

    assert_eq!(point_names(&client), vec!["Blue Corner", "Manta Point"]);
    let record = client.prefs().read().unwrap();
    assert_eq!(record.last_synced_marker.as_deref(), Some(MARKER_FEB));
}

#[test]
fn engine_version_bump_forces_one_resync() {
    let mut client = TestClient::file(seeded_remote());
    assert!(client.engine.sync_if_needed(false));
    assert_eq!(client.remote.fetch_calls(), 1);

    // Same remote marker, new engine version tag after an app update.
    client.restart_with_engine_version("v99-test");
    assert!(client.engine.sync_if_needed(false));
    assert_eq!(client.remote.fetch_calls(), 2);

    // The forced resync happens exactly once.
    assert!(!client.engine.sync_if_needed(false));
    assert_eq!(client.remote.fetch_calls(), 2);
}

#[test]
fn missing_database_redownloads_despite_fresh_marker() {
    let client = TestClient::file(seeded_remote());
    assert!(client.engine.sync_if_needed(false));

    std::fs::remove_file(client.db_path()).unwrap();
    assert!(client.engine.sync_if_needed(false));
    assert!(client.db_present());
    assert_eq!(client.remote.fetch_calls(), 2);
}

#[test]
fn forced_sync_redownloads_when_fresh() {
    let client = TestClient::file(seeded_remote());
    assert!(client.engine.sync_if_needed(false));
    assert!(client.engine.sync_if_needed(true));
    assert_eq!(client.remote.fetch_calls(), 2);
}

#[test]
fn download_403_is_soft_failure() {
    let client = TestClient::file(seeded_remote());
    assert!(client.engine.sync_if_needed(false));

    client
        .remote
        .publish(MARKER_FEB, gzip(&snapshot_image(&[("p9", "New Site")])));
    client.remote.fail_fetch_with_status(403);

    assert!(!client.engine.sync_if_needed(false));

    // Version record and installed data are untouched by the failure.
    let record = client.prefs().read().unwrap();
    assert_eq!(record.last_synced_marker.as_deref(), Some(MARKER_JAN));
    assert_eq!(point_names(&client), vec!["Blue Corner"]);
}

#[test]
fn metadata_outage_returns_false_without_fetch() {
    let client = TestClient::file(seeded_remote());
    client.remote.fail_metadata("connection refused");

    assert!(!client.engine.sync_if_needed(false));
    assert_eq!(client.remote.fetch_calls(), 0);
}

#[test]
fn plain_payload_installs_unchanged() {
    // The transport (or publisher) delivered the image uncompressed.
    let remote = Arc::new(TestSnapshotSource::new(
        MARKER_JAN,
        snapshot_image(&[("p1", "Blue Corner")]),
    ));
    let client = TestClient::file(remote);

    assert!(client.engine.sync_if_needed(false));
    assert_eq!(point_names(&client), vec!["Blue Corner"]);
}

#[test]
fn corrupt_gzip_installs_raw_bytes() {
    // Gzip magic followed by garbage: inflate fails, and the raw bytes are
    // installed unchanged on the assumption the transport already inflated
    // the object. No error escapes the engine.
    let mut raw = vec![0x1f, 0x8b];
    raw.extend_from_slice(b"definitely not a deflate stream");
    let remote = Arc::new(TestSnapshotSource::new(MARKER_JAN, raw.clone()));
    let client = TestClient::file(remote);

    assert!(client.engine.sync_if_needed(false));
    assert_eq!(std::fs::read(client.db_path()).unwrap(), raw);
}

struct GatedSource {
    marker: String,
    payload: Vec<u8>,
    gate: std::sync::Mutex<mpsc::Receiver<()>>,
    fetches: AtomicUsize,
}

impl SnapshotSource for GatedSource {
    fn metadata(&self, _path: &str) -> Result<RemoteMetadata, SyncError> {
        Ok(RemoteMetadata {
            marker: self.marker.clone(),
        })
    }

    fn fetch(&self, _path: &str) -> Result<Vec<u8>, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap();
        gate.recv().ok();
        Ok(self.payload.clone())
    }
}

#[test]
fn single_flight_allows_exactly_one_install() {
    let dir = tempfile::tempdir().unwrap();
    let (release, gate) = mpsc::channel();
    let source = Arc::new(GatedSource {
        marker: MARKER_JAN.to_string(),
        payload: gzip(&snapshot_image(&[("p1", "Blue Corner")])),
        gate: std::sync::Mutex::new(gate),
        fetches: AtomicUsize::new(0),
    });

    let engine = Arc::new(SyncEngine::new(
        Box::new(source.clone()),
        Box::new(FileDatabase::new(dir.path().join("SQLite"), MASTER_DB_NAME)),
        PrefsStore::open(dir.path().join("sync.prefs")),
        SyncConfig::default(),
    ));

    let worker = {
        let engine = engine.clone();
        std::thread::spawn(move || engine.sync_if_needed(false))
    };

    // Wait until the first sync has reached the download step.
    let mut reached_fetch = false;
    for _ in 0..2000 {
        if engine.state() == SyncState::Fetching {
            reached_fetch = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(reached_fetch, "first sync never reached the fetch step");

    // A concurrent call is an immediate no-op, no second download.
    assert!(!engine.sync_if_needed(false));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

    release.send(()).unwrap();
    assert!(worker.join().unwrap());
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(engine.state(), SyncState::Idle);

    // Once released, the guard allows a new cycle (now up to date).
    assert!(!engine.sync_if_needed(false));
}
