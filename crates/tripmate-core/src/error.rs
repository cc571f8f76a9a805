//! Common error types for tripmate.
//!
//! This module provides shared error types that are used across multiple crates.

use crate::ids::{DocumentId, SessionId, TripId};
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the tripmate system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A trip with the specified ID was not found.
    #[error("trip not found: {0}")]
    TripNotFound(TripId),

    /// A document with the specified ID was not found.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// A chat session with the specified ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
