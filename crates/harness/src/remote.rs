use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use divesync_engine::{RemoteMetadata, SnapshotSource, SyncError};

#[derive(Default)]
struct RemoteState {
    marker: String,
    payload: Vec<u8>,
    metadata_error: Option<String>,
    fetch_status: Option<u16>,
}

/// In-memory stand-in for the snapshot bucket: a single object with a
/// marker and a payload, call counters, and fault injection.
pub struct TestSnapshotSource {
    state: Mutex<RemoteState>,
    metadata_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl TestSnapshotSource {
    pub fn new(marker: &str, payload: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(RemoteState {
                marker: marker.to_string(),
                payload,
                metadata_error: None,
                fetch_status: None,
            }),
            metadata_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Publish a new snapshot version, clearing any injected faults.
    pub fn publish(&self, marker: &str, payload: Vec<u8>) {
        let mut state = self.state.lock().expect("remote state lock");
        state.marker = marker.to_string();
        state.payload = payload;
        state.metadata_error = None;
        state.fetch_status = None;
    }

    /// Make the next metadata calls fail, as if the network were down.
    pub fn fail_metadata(&self, message: &str) {
        let mut state = self.state.lock().expect("remote state lock");
        state.metadata_error = Some(message.to_string());
    }

    /// Make fetch return the given non-success HTTP status.
    pub fn fail_fetch_with_status(&self, status: u16) {
        let mut state = self.state.lock().expect("remote state lock");
        state.fetch_status = Some(status);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for TestSnapshotSource {
    fn metadata(&self, _path: &str) -> Result<RemoteMetadata, SyncError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("remote state lock");
        if let Some(message) = &state.metadata_error {
            return Err(SyncError::RemoteUnavailable(message.clone()));
        }
        Ok(RemoteMetadata {
            marker: state.marker.clone(),
        })
    }

    fn fetch(&self, _path: &str) -> Result<Vec<u8>, SyncError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("remote state lock");
        if let Some(status) = state.fetch_status {
            return Err(SyncError::DownloadFailed { status });
        }
        Ok(state.payload.clone())
    }
}
