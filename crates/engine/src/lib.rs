pub mod bootstrap;
pub mod error;
pub mod freshness;
pub mod install;
pub mod prefs;
pub mod remote;

pub use error::SyncError;
pub use install::{FileDatabase, LocalDatabase, SandboxDatabase};
pub use prefs::{PrefsStore, VersionRecord};
pub use remote::{HttpSnapshotSource, RemoteMetadata, SnapshotSource};

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

use divesync_core::codec;

/// Where the sync pipeline currently is. Observable snapshot of the state
/// machine; transitions happen only inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncState {
    Idle = 0,
    Checking = 1,
    Fetching = 2,
    Decoding = 3,
    Installing = 4,
}

/// Single-flight guard: at most one sync sequence per engine. A second
/// caller while one is in flight gets an immediate no-op, never a queue.
struct Flight {
    state: AtomicU8,
}

impl Flight {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(SyncState::Idle as u8),
        }
    }

    fn begin(&self) -> Option<FlightGuard<'_>> {
        self.state
            .compare_exchange(
                SyncState::Idle as u8,
                SyncState::Checking as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()?;
        Some(FlightGuard { flight: self })
    }

    fn current(&self) -> SyncState {
        match self.state.load(Ordering::Acquire) {
            1 => SyncState::Checking,
            2 => SyncState::Fetching,
            3 => SyncState::Decoding,
            4 => SyncState::Installing,
            _ => SyncState::Idle,
        }
    }
}

struct FlightGuard<'a> {
    flight: &'a Flight,
}

impl FlightGuard<'_> {
    fn advance(&self, state: SyncState) {
        self.flight.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight
            .state
            .store(SyncState::Idle as u8, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Logical path of the snapshot inside the master-data bucket.
    pub remote_path: String,
    /// Current engine version tag; a mismatch with the persisted tag forces
    /// one resync.
    pub engine_version: String,
    /// Dataset shipped inside the application package, extracted on first
    /// launch. `None` on runtimes without a bundled asset.
    pub bundled_asset: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_path: divesync_core::SNAPSHOT_REMOTE_PATH.to_string(),
            engine_version: divesync_core::ENGINE_VERSION.to_string(),
            bundled_asset: None,
        }
    }
}

/// Top-level sync orchestrator.
///
/// Owns all writes to the local database slot and the version record;
/// reads bypass it entirely and go straight to a `MasterStore`. Every
/// failure inside the pipeline is downgraded here to a logged `false`
/// outcome: synchronization failure is never a crash for the caller.
pub struct SyncEngine {
    source: Box<dyn SnapshotSource>,
    db: Mutex<Box<dyn LocalDatabase>>,
    prefs: PrefsStore,
    config: SyncConfig,
    flight: Flight,
}

impl SyncEngine {
    pub fn new(
        source: Box<dyn SnapshotSource>,
        db: Box<dyn LocalDatabase>,
        prefs: PrefsStore,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            db: Mutex::new(db),
            prefs,
            config,
            flight: Flight::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.flight.current()
    }

    /// Check remote staleness and install a new snapshot when needed.
    /// Returns whether anything changed locally. Never panics and never
    /// propagates an error; a concurrent call while a sync is in flight
    /// returns `false` immediately.
    pub fn sync_if_needed(&self, force: bool) -> bool {
        let Some(guard) = self.flight.begin() else {
            tracing::debug!("sync already in flight, skipping");
            return false;
        };

        match self.run(force, &guard) {
            Ok(changed) => changed,
            Err(err) => {
                tracing::warn!(error = %err, "master data sync failed, keeping local data");
                self.ensure_fallback();
                false
            }
        }
    }

    fn run(&self, force: bool, guard: &FlightGuard<'_>) -> Result<bool, SyncError> {
        let mut db = self.lock_db();

        if let Some(asset) = &self.config.bundled_asset {
            match bootstrap::ensure_database(db.as_mut(), asset) {
                Ok(true) => tracing::info!("bundled database extracted"),
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "bootstrap failed, continuing with sync");
                }
            }
        }

        let record = self.prefs.read()?;
        let fresh = freshness::should_sync(
            self.source.as_ref(),
            &self.config.remote_path,
            &record,
            &self.config.engine_version,
            db.is_present(),
            force,
        )?;
        if !fresh.needed {
            tracing::debug!("master data is up to date");
            return Ok(false);
        }

        guard.advance(SyncState::Fetching);
        tracing::info!(marker = %fresh.remote_marker, "new master data version detected, downloading");
        let raw = self.source.fetch(&self.config.remote_path)?;

        guard.advance(SyncState::Decoding);
        let image = match codec::decode(&raw) {
            Ok(image) => image,
            Err(err) => {
                // The stored object is nominally gzip, but a transcoding
                // transport may have delivered it already inflated. Install
                // the raw bytes unchanged in that case.
                tracing::warn!(error = %err, "inflate failed, installing raw bytes");
                raw
            }
        };
        if !codec::is_sqlite_image(&image) {
            tracing::debug!("resolved payload does not start with the SQLite header");
        }

        guard.advance(SyncState::Installing);
        db.install(&image)?;

        self.prefs.write(&VersionRecord {
            last_synced_marker: Some(fresh.remote_marker.clone()),
            engine_version: Some(self.config.engine_version.clone()),
        })?;
        tracing::info!(marker = %fresh.remote_marker, "master data updated to latest version");
        Ok(true)
    }

    /// Last resort after a failed sync: if no database exists at all, put
    /// an empty but structurally valid one in place so reads degrade to
    /// empty results instead of crashing.
    fn ensure_fallback(&self) {
        let mut db = self.lock_db();
        if db.is_present() {
            return;
        }
        tracing::warn!("no local database after failed sync, creating empty schema");
        if let Err(err) = db.create_empty_schema() {
            tracing::warn!(error = %err, "fallback schema creation failed");
        }
    }

    fn lock_db(&self) -> std::sync::MutexGuard<'_, Box<dyn LocalDatabase>> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
