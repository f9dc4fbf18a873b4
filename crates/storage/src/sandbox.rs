use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use crate::error::StorageError;
use crate::traits::{self, MasterStore, Row, Value};

/// Virtual file layer for the sandboxed runtime.
///
/// The runtime has no general filesystem access; every database file lives
/// in an origin-private namespace and is addressed by a logical name only.
/// `SandboxFs` owns that namespace: callers never see or construct paths
/// into it, and all block I/O for `SandboxStore` is routed through it.
#[derive(Debug, Clone)]
pub struct SandboxFs {
    root: PathBuf,
}

impl SandboxFs {
    /// Register the virtual file layer over the given private root,
    /// creating the namespace if it does not exist yet. Must happen before
    /// the first open of a sandboxed database.
    pub fn register(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Replace the virtual file's contents with `image`. The new bytes are
    /// staged under a temporary name inside the same namespace and renamed
    /// over the live file, so a concurrent reader sees either the old or
    /// the new contents, never a torn file.
    pub fn import(&self, name: &str, image: &[u8]) -> Result<(), StorageError> {
        let live = self.resolve(name)?;
        let staging = self.resolve(&format!("{name}.staging"))?;
        fs::write(&staging, image)?;
        fs::rename(&staging, &live)?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    pub(crate) fn path_of(&self, name: &str) -> Result<PathBuf, StorageError> {
        self.resolve(name)
    }
}

/// Sandboxed-storage backend: same embedded engine as `SqliteStore`, but
/// the database is addressed by logical name through a `SandboxFs`.
pub struct SandboxStore {
    fs: SandboxFs,
    name: String,
    conn: Option<Connection>,
}

impl SandboxStore {
    pub fn open(fs: SandboxFs, name: &str) -> Result<Self, StorageError> {
        // Validate the logical name up front, before any lazy open.
        fs.path_of(name)?;
        Ok(Self {
            fs,
            name: name.to_string(),
            conn: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the database contents with a full byte image, preserving the
    /// open/close lifecycle: the connection is released around the swap and
    /// reopened lazily by the next query.
    pub fn import_image(&mut self, image: &[u8]) -> Result<(), StorageError> {
        self.close()?;
        self.fs.import(&self.name, image)?;
        tracing::debug!(name = %self.name, bytes = image.len(), "database image imported");
        Ok(())
    }

    fn conn(&mut self) -> Result<&Connection, StorageError> {
        if self.conn.is_none() {
            let path = self.fs.path_of(&self.name)?;
            let conn = Connection::open(&path)?;
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            self.conn = Some(conn);
        }
        Ok(self.conn.as_ref().expect("connection just opened"))
    }
}

impl MasterStore for SandboxStore {
    fn query_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        let conn = self.conn()?;
        traits::query_all_rows(conn, sql, params)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        traits::execute_stmt(conn, sql, params)
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
        }
        Ok(())
    }
}
