//! Error types for index operations.

/// Errors raised by the index containers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// A key or position was outside the range the container accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A mutation was attempted through a read-only surface.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An iterator observed a batch of pending inserts that appeared
    /// after it was positioned.
    #[error("concurrent modification: pending inserts appeared during iteration")]
    ConcurrentModification,
}

impl IndexError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }
}
