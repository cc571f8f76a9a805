//! Error types for the chat client.

use thiserror::Error;
use tripmate_core::CoreError;

/// A result type using `ChatError`.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Generic message used when an error response carries no `detail`.
pub const GENERIC_API_ERROR: &str = "API error";

/// Errors that can occur while talking to the chat backend.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP request failed (connect, timeout, or reading the body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    ///
    /// `message` is the response's `detail`, or [`GENERIC_API_ERROR`].
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the backend.
        message: String,
    },

    /// A success response could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// A referenced entity does not exist, or an identifier was invalid.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ChatError {
    /// The HTTP status, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::Core(_) => None,
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}
