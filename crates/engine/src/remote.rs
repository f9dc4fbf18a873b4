use std::time::Duration;

use crate::error::SyncError;

const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// Metadata of the remote snapshot, read without downloading the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Server-assigned last-modified marker. Opaque: compared for equality
    /// only, never ordered.
    pub marker: String,
}

/// Where snapshots come from. The HTTP implementation talks to the object
/// store; the harness substitutes an in-memory source.
pub trait SnapshotSource: Send + Sync {
    /// Retrieve the snapshot's marker via a metadata-only call.
    fn metadata(&self, path: &str) -> Result<RemoteMetadata, SyncError>;

    /// Retrieve the snapshot's full content.
    fn fetch(&self, path: &str) -> Result<Vec<u8>, SyncError>;
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for std::sync::Arc<T> {
    fn metadata(&self, path: &str) -> Result<RemoteMetadata, SyncError> {
        (**self).metadata(path)
    }

    fn fetch(&self, path: &str) -> Result<Vec<u8>, SyncError> {
        (**self).fetch(path)
    }
}

/// Object-store source over plain HTTP: HEAD for the marker, GET for the
/// payload. Automatic gzip handling is disabled so the engine sees the
/// stored bytes whenever the transport does not transcode them itself.
pub struct HttpSnapshotSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSnapshotSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TRANSPORT_TIMEOUT)
            .no_gzip()
            .build()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn metadata(&self, path: &str) -> Result<RemoteMetadata, SyncError> {
        let response = self
            .client
            .head(self.url(path))
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RemoteUnavailable(format!(
                "metadata request returned {status}"
            )));
        }

        let marker = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SyncError::RemoteUnavailable("missing last-modified header".into()))?
            .to_string();

        Ok(RemoteMetadata { marker })
    }

    fn fetch(&self, path: &str) -> Result<Vec<u8>, SyncError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
