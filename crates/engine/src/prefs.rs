use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// The persisted sync state: last installed remote marker plus the engine
/// version tag it was installed under. Lives in a small sidecar file, never
/// inside the database itself, and is written only after a successful
/// install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub last_synced_marker: Option<String>,
    pub engine_version: Option<String>,
}

/// File-backed key-value persistence for the version record.
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Absent file reads as the default (empty) record, the first-install
    /// state.
    pub fn read(&self) -> Result<VersionRecord, SyncError> {
        match fs::read(&self.path) {
            Ok(bytes) => rmp_serde::from_slice(&bytes)
                .map_err(|e| SyncError::VersionRecord(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(VersionRecord::default()),
            Err(e) => Err(SyncError::VersionRecord(e.to_string())),
        }
    }

    pub fn write(&self, record: &VersionRecord) -> Result<(), SyncError> {
        let bytes =
            rmp_serde::to_vec(record).map_err(|e| SyncError::VersionRecord(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::VersionRecord(e.to_string()))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, &bytes).map_err(|e| SyncError::VersionRecord(e.to_string()))?;
        fs::rename(&staging, &self.path).map_err(|e| SyncError::VersionRecord(e.to_string()))?;
        Ok(())
    }
}
