use rusqlite::Connection;

use crate::error::{self, StorageError};

pub use rusqlite::types::Value;

/// One result row: column names paired positionally with values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn real(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Uniform query contract over the installed master database.
///
/// The two implementations (direct file path, sandboxed virtual file) are
/// drop-in interchangeable: identical signatures, identical row shape,
/// identical close/reopen lifecycle. A query against a missing table yields
/// an empty result set with a warning, never an error.
pub trait MasterStore {
    fn query_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError>;

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, StorageError>;

    fn execute_batch(&mut self, sql: &str) -> Result<(), StorageError>;

    /// Release the underlying connection. The store stays usable; the next
    /// query reopens it.
    fn close(&mut self) -> Result<(), StorageError>;
}

pub(crate) fn query_all_rows(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>, StorageError> {
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) if error::is_missing_table(&e) => {
            tracing::warn!(%sql, "query against missing table, returning no rows");
            return Ok(Vec::new());
        }
        Err(e) => return Err(StorageError::Sqlite(e)),
    };

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(row.get::<_, Value>(idx)?);
        }
        out.push(Row {
            columns: columns.clone(),
            values,
        });
    }
    Ok(out)
}

pub(crate) fn execute_stmt(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<usize, StorageError> {
    match conn.execute(sql, rusqlite::params_from_iter(params.iter())) {
        Ok(changed) => Ok(changed),
        Err(e) if error::is_missing_table(&e) => {
            tracing::warn!(%sql, "statement against missing table, skipped");
            Ok(0)
        }
        Err(e) => Err(StorageError::Sqlite(e)),
    }
}
