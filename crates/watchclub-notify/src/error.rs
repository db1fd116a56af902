use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The sender could not hand the message to its provider.
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("notification queue full")]
    QueueFull,

    #[error("notification queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, NotifyError>;
