use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid database name: {0}")]
    InvalidName(String),
}

/// Whether a rusqlite error is a "no such table" failure. Optional or newer
/// tables may be absent from an older cached snapshot; callers probing for
/// them must see an empty result set, not a fatal error.
pub fn is_missing_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.starts_with("no such table"),
        _ => false,
    }
}
