pub mod error;
pub mod sandbox;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use sandbox::{SandboxFs, SandboxStore};
pub use sqlite::SqliteStore;
pub use traits::{MasterStore, Row, Value};
