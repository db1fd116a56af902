use thiserror::Error;

/// Request-level error taxonomy. Storage, scheduling and notification crates
/// keep their own error types; the service maps them onto this one.
#[derive(Debug, Error)]
pub enum WatchclubError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The request is well-formed but the entity is in the wrong state.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WatchclubError {
    /// Short error code string for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            WatchclubError::InvalidArgument(_) => "INVALID_ARGUMENT",
            WatchclubError::NotFound(_) => "NOT_FOUND",
            WatchclubError::AlreadyExists(_) => "ALREADY_EXISTS",
            WatchclubError::FailedPrecondition(_) => "FAILED_PRECONDITION",
            WatchclubError::PermissionDenied(_) => "PERMISSION_DENIED",
            WatchclubError::Config(_) => "CONFIG_ERROR",
            WatchclubError::Internal(_) => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchclubError>;
