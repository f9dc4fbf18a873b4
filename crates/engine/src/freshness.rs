use crate::error::SyncError;
use crate::prefs::VersionRecord;
use crate::remote::SnapshotSource;

#[derive(Debug, Clone)]
pub struct Freshness {
    pub needed: bool,
    pub remote_marker: String,
}

/// Decide whether a new snapshot must be installed.
///
/// A sync is skipped only when all of the following hold: not forced, the
/// stored marker equals the fresh remote marker, the stored engine version
/// equals the current tag, and the local database is actually present.
/// Reads remote metadata only; never writes the version record.
pub fn should_sync(
    source: &dyn SnapshotSource,
    remote_path: &str,
    record: &VersionRecord,
    engine_version: &str,
    db_present: bool,
    force: bool,
) -> Result<Freshness, SyncError> {
    let metadata = source.metadata(remote_path)?;

    let marker_fresh = record.last_synced_marker.as_deref() == Some(metadata.marker.as_str());
    let engine_fresh = record.engine_version.as_deref() == Some(engine_version);
    let needed = force || !marker_fresh || !engine_fresh || !db_present;

    Ok(Freshness {
        needed,
        remote_marker: metadata.marker,
    })
}
