//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while resolving the signed-in user or its token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No user is signed in.
    #[error("not signed in")]
    NotSignedIn,

    /// The ID token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The token was requested for a user other than the signed-in one.
    #[error("token requested for a different user")]
    UserMismatch,

    /// The user ID in the token is malformed.
    #[error("invalid user ID format")]
    InvalidUserId,

    /// A required claim is missing from the token.
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    /// The token format is invalid.
    #[error("invalid token format: {0}")]
    InvalidToken(String),
}

impl AuthError {
    /// Returns `true` if signing in again may resolve the error.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::NotSignedIn)
    }
}
