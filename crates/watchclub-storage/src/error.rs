use thiserror::Error;

/// Errors surfaced by every storage backend.
///
/// `NotFound` and `AlreadyExists` are caller-attributable; everything else is
/// a backend failure the service reports as internal.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored blob could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unsupported storage URI: {0}")]
    UnsupportedUri(String),

    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
