//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested document was not found.
    #[error("document not found")]
    NotFound,

    /// The document scope does not match the collection (e.g. a task without a trip).
    #[error("invalid document path: {0}")]
    InvalidPath(String),

    /// The document body is not a JSON object.
    #[error("invalid document body: {0}")]
    InvalidBody(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Machine-readable code reported in [`ServiceResponse::error_code`](crate::ServiceResponse).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::InvalidPath(_) | Self::InvalidBody(_) => "invalid-argument",
            Self::Database(_) => "unavailable",
            Self::Serialization(_) => "data-loss",
        }
    }
}
