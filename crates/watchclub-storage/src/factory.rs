use std::sync::Arc;

use tracing::info;

use crate::error::{Result, StorageError};
use crate::memory::MemoryStorage;
use crate::sqlite::SqliteStorage;
use crate::store::Storage;

const SQLITE_SCHEME: &str = "sqlite://";

/// Build a backend from a storage URI.
///
/// | URI                | Backend                  |
/// |--------------------|--------------------------|
/// | `""` / `memory`    | [`MemoryStorage`]        |
/// | `sqlite://<path>`  | [`SqliteStorage`] file   |
pub fn open_storage(uri: &str) -> Result<Arc<dyn Storage>> {
    if uri.is_empty() || uri == "memory" {
        info!("using in-memory storage");
        return Ok(Arc::new(MemoryStorage::new()));
    }

    if let Some(path) = uri.strip_prefix(SQLITE_SCHEME) {
        if path.is_empty() {
            return Err(StorageError::UnsupportedUri(
                "sqlite URI must include a file path".to_string(),
            ));
        }
        return Ok(Arc::new(SqliteStorage::open(path)?));
    }

    Err(StorageError::UnsupportedUri(format!(
        "{uri} (supported: memory, sqlite://<path>)"
    )))
}
