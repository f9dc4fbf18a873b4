use divesync_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote metadata unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("download failed with status {status}")]
    DownloadFailed { status: u16 },

    #[error("install failed: {0}")]
    InstallFailed(String),

    #[error("bootstrap failed: {0}")]
    BootstrapFailed(String),

    #[error("version record error: {0}")]
    VersionRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
