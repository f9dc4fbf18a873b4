use std::fs;
use std::path::Path;

use crate::error::SyncError;
use crate::install::LocalDatabase;

/// Guarantee a usable (possibly stale) database before the first network
/// attempt by extracting the dataset bundled with the application package.
/// No-ops when a database already exists. Returns whether an extraction
/// happened.
pub fn ensure_database(
    db: &mut dyn LocalDatabase,
    bundled_asset: &Path,
) -> Result<bool, SyncError> {
    if db.is_present() {
        return Ok(false);
    }

    tracing::info!(asset = %bundled_asset.display(), "no local database found, extracting bundled asset");
    let image = fs::read(bundled_asset)
        .map_err(|e| SyncError::BootstrapFailed(format!("bundled asset unreadable: {e}")))?;
    db.install(&image)
        .map_err(|e| SyncError::BootstrapFailed(e.to_string()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::FileDatabase;

    #[test]
    fn extracts_bundled_asset_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("bundled_master.db");
        fs::write(&asset, b"seed image").unwrap();

        let mut db = FileDatabase::new(dir.path().join("SQLite"), "master.db");
        assert!(ensure_database(&mut db, &asset).unwrap());
        assert_eq!(fs::read(db.db_path()).unwrap(), b"seed image");
    }

    #[test]
    fn noop_when_database_exists() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("bundled_master.db");
        fs::write(&asset, b"seed image").unwrap();

        let mut db = FileDatabase::new(dir.path().join("SQLite"), "master.db");
        db.install(b"already installed").unwrap();

        assert!(!ensure_database(&mut db, &asset).unwrap());
        assert_eq!(fs::read(db.db_path()).unwrap(), b"already installed");
    }

    #[test]
    fn missing_asset_is_bootstrap_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = FileDatabase::new(dir.path().join("SQLite"), "master.db");
        let err = ensure_database(&mut db, &dir.path().join("nope.db")).unwrap_err();
        assert!(matches!(err, SyncError::BootstrapFailed(_)));
        assert!(!db.is_present());
    }
}
