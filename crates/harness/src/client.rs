use std::path::PathBuf;
use std::sync::Arc;

use divesync_core::MASTER_DB_NAME;
use divesync_engine::{
    FileDatabase, LocalDatabase, PrefsStore, SandboxDatabase, SyncConfig, SyncEngine,
};
use divesync_storage::{MasterStore, SandboxFs, SandboxStore, SqliteStore};
use tempfile::TempDir;

use crate::remote::TestSnapshotSource;

enum BackendKind {
    File,
    Sandbox(SandboxFs),
}

/// One simulated client device: a temp data directory, a sync engine wired
/// to a test remote, and read access to whichever backend it uses.
pub struct TestClient {
    dir: TempDir,
    pub remote: Arc<TestSnapshotSource>,
    pub engine: SyncEngine,
    kind: BackendKind,
}

impl TestClient {
    /// Mobile-shaped client: filesystem backend, no bundled asset.
    pub fn file(remote: Arc<TestSnapshotSource>) -> Self {
        Self::build(remote, false, SyncConfig::default())
    }

    /// Mobile-shaped client with a bundled seed dataset in its package.
    pub fn file_with_bundled(remote: Arc<TestSnapshotSource>, seed_image: &[u8]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let asset = dir.path().join("bundled_master.db");
        std::fs::write(&asset, seed_image).expect("write bundled asset");
        let config = SyncConfig {
            bundled_asset: Some(asset),
            ..SyncConfig::default()
        };
        Self::build_in(dir, remote, false, config)
    }

    /// Mobile-shaped client pointing its bundled asset at a missing file.
    pub fn file_with_broken_bundle(remote: Arc<TestSnapshotSource>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SyncConfig {
            bundled_asset: Some(dir.path().join("missing_asset.db")),
            ..SyncConfig::default()
        };
        Self::build_in(dir, remote, false, config)
    }

    /// Browser-shaped client: sandboxed virtual-file backend.
    pub fn sandbox(remote: Arc<TestSnapshotSource>) -> Self {
        Self::build(remote, true, SyncConfig::default())
    }

    fn build(remote: Arc<TestSnapshotSource>, sandboxed: bool, config: SyncConfig) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self::build_in(dir, remote, sandboxed, config)
    }

    fn build_in(
        dir: TempDir,
        remote: Arc<TestSnapshotSource>,
        sandboxed: bool,
        config: SyncConfig,
    ) -> Self {
        let kind = if sandboxed {
            let fs = SandboxFs::register(dir.path().join("opfs")).expect("register sandbox fs");
            BackendKind::Sandbox(fs)
        } else {
            BackendKind::File
        };
        let engine = Self::make_engine(&dir, &kind, remote.clone(), config);
        Self {
            dir,
            remote,
            engine,
            kind,
        }
    }

    fn make_engine(
        dir: &TempDir,
        kind: &BackendKind,
        remote: Arc<TestSnapshotSource>,
        config: SyncConfig,
    ) -> SyncEngine {
        let db: Box<dyn LocalDatabase> = match kind {
            BackendKind::File => Box::new(FileDatabase::new(
                dir.path().join("SQLite"),
                MASTER_DB_NAME,
            )),
            BackendKind::Sandbox(fs) => Box::new(SandboxDatabase::new(fs.clone(), MASTER_DB_NAME)),
        };
        let prefs = PrefsStore::open(dir.path().join("sync.prefs"));
        SyncEngine::new(Box::new(remote), db, prefs, config)
    }

    /// Rebuild the engine over the same local state, as after an app
    /// restart, optionally with a different engine version tag.
    pub fn restart_with_engine_version(&mut self, version: &str) {
        let config = SyncConfig {
            engine_version: version.to_string(),
            ..SyncConfig::default()
        };
        self.engine = Self::make_engine(&self.dir, &self.kind, self.remote.clone(), config);
    }

    /// Path of the live database file (filesystem backend only).
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("SQLite").join(MASTER_DB_NAME)
    }

    pub fn db_present(&self) -> bool {
        match &self.kind {
            BackendKind::File => self.db_path().is_file(),
            BackendKind::Sandbox(fs) => fs.exists(MASTER_DB_NAME),
        }
    }

    /// The persisted version record store, as the engine sees it.
    pub fn prefs(&self) -> PrefsStore {
        PrefsStore::open(self.dir.path().join("sync.prefs"))
    }

    /// Open a read store against the installed database, the way the
    /// application's read layer does: directly, bypassing the engine.
    pub fn open_store(&self) -> Box<dyn MasterStore> {
        match &self.kind {
            BackendKind::File => {
                Box::new(SqliteStore::open(self.db_path()).expect("open sqlite store"))
            }
            BackendKind::Sandbox(fs) => Box::new(
                SandboxStore::open(fs.clone(), MASTER_DB_NAME).expect("open sandbox store"),
            ),
        }
    }
}
