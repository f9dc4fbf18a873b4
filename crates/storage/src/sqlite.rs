use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::StorageError;
use crate::traits::{self, MasterStore, Row, Value};

/// Filesystem backend: opens the master database directly by path.
pub struct SqliteStore {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            conn: None,
        };
        store.conn()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&mut self) -> Result<&Connection, StorageError> {
        if self.conn.is_none() {
            let conn = Connection::open(&self.path)?;
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            self.conn = Some(conn);
        }
        Ok(self.conn.as_ref().expect("connection just opened"))
    }
}

impl MasterStore for SqliteStore {
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
