use std::fs;
use std::path::{Path, PathBuf};

use divesync_storage::{MasterStore, SandboxFs, SandboxStore, SqliteStore, schema};

use crate::error::SyncError;

/// The live local database slot, as the orchestrator sees it: presence
/// check, atomic image install, and last-resort empty schema. Writes to the
/// slot go only through this trait.
pub trait LocalDatabase: Send {
    fn is_present(&self) -> bool;

    /// Replace the live database with `image`. Must be atomic with respect
    /// to concurrent readers: old contents or new contents, never a torn
    /// file.
    fn install(&mut self, image: &[u8]) -> Result<(), SyncError>;

    /// Create the empty fallback schema in the live slot.
    fn create_empty_schema(&mut self) -> Result<(), SyncError>;
}

/// Filesystem slot: `<dir>/<name>`, installed via write-to-temp-then-rename.
pub struct FileDatabase {
    dir: PathBuf,
    name: String,
}

impl FileDatabase {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{}.download", self.name))
    }
}

impl LocalDatabase for FileDatabase {
    fn is_present(&self) -> bool {
        self.db_path().is_file()
    }

    fn install(&mut self, image: &[u8]) -> Result<(), SyncError> {
        let wrap = |e: std::io::Error| SyncError::InstallFailed(e.to_string());

        fs::create_dir_all(&self.dir).map_err(wrap)?;
        let staging = self.staging_path();
        fs::write(&staging, image).map_err(wrap)?;
        fs::rename(&staging, self.db_path()).map_err(wrap)?;

        // A freshly installed image must not get paired with journal
        // sidecars left over from the previous database.
        for suffix in ["-wal", "-shm", "-journal"] {
            let sidecar = self.dir.join(format!("{}{suffix}", self.name));
            remove_if_exists(&sidecar).map_err(wrap)?;
        }
        Ok(())
    }

    fn create_empty_schema(&mut self) -> Result<(), SyncError> {
        fs::create_dir_all(&self.dir).map_err(|e| SyncError::InstallFailed(e.to_string()))?;
        let mut store = SqliteStore::open(self.db_path())?;
        schema::init_fallback_schema(&mut store)?;
        store.close()?;
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Sandboxed slot: a logical name inside the virtual file namespace;
/// install imports the byte image through the `SandboxFs` layer.
pub struct SandboxDatabase {
    fs: SandboxFs,
    name: String,
}

impl SandboxDatabase {
    pub fn new(fs: SandboxFs, name: impl Into<String>) -> Self {
        Self {
            fs,
            name: name.into(),
        }
    }
}

impl LocalDatabase for SandboxDatabase {
    fn is_present(&self) -> bool {
        self.fs.exists(&self.name)
    }

    fn install(&mut self, image: &[u8]) -> Result<(), SyncError> {
        self.fs
            .import(&self.name, image)
            .map_err(|e| SyncError::InstallFailed(e.to_string()))
    }

    fn create_empty_schema(&mut self) -> Result<(), SyncError> {
        let mut store = SandboxStore::open(self.fs.clone(), &self.name)?;
        schema::init_fallback_schema(&mut store)?;
        store.close()?;
        Ok(())
    }
}
