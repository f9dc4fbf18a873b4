pub mod codec;
pub mod error;

pub use error::CoreError;

/// Logical path of the current snapshot inside the master-data bucket.
pub const SNAPSHOT_REMOTE_PATH: &str = "v1/master/latest.db.gz";

/// Fixed name of the installed master database. On the filesystem backend
/// this is a file name; on the sandboxed backend it is the logical name
/// inside the virtual file namespace.
pub const MASTER_DB_NAME: &str = "master.db";

/// Bumped whenever the on-disk format or a storage backend changes
/// incompatibly. A mismatch with the persisted tag forces one full resync
/// even when the remote marker is unchanged.
pub const ENGINE_VERSION: &str = "v2-sandbox-r1";
