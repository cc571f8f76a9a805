//! Signed-in user and ID token provider for tripmate.
//!
//! The chat backend and the document store both authorize requests with the
//! signed-in user's ID token. This crate exposes that boundary as the
//! [`AuthProvider`] trait:
//!
//! - [`TokenAuthProvider`] holds a bearer ID token obtained elsewhere and
//!   reads the user from its claims
//! - `MockAuthProvider` (feature `test-utils`) signs in fixed users
//!
//! # Example
//!
//! ```no_run
//! use tripmate_auth::{AuthProvider, TokenAuthProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = TokenAuthProvider::from_token("eyJhbGciOiJSUzI1NiJ9...")?;
//!
//! if let Some(user) = provider.current_user() {
//!     let token = provider.id_token(&user).await?;
//!     println!("{} -> {} bytes of token", user.uid, token.len());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod token;

pub use error::{AuthError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockAuthProvider;
pub use token::TokenAuthProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tripmate_core::{Listener, Subscription, UserId};

/// Callback invoked with the signed-in user, or `None` after sign-out.
pub type AuthListener = Listener<Option<User>>;

/// Handle returned by [`AuthProvider::subscribe`]; dropping it unregisters the listener.
pub type AuthSubscription = Subscription;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier.
    pub uid: UserId,
    /// Email address, if known.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name, if known.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Source of the signed-in user and its ID token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;

    /// A bearer token for `user`, suitable for `Authorization: Bearer`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` if nobody is signed in,
    /// `AuthError::UserMismatch` if `user` is not the signed-in user, and
    /// `AuthError::TokenExpired` if the token can no longer be used.
    async fn id_token(&self, user: &User) -> Result<String>;

    /// Register a listener for sign-in and sign-out.
    ///
    /// The listener is invoked once immediately with the current user.
    fn subscribe(&self, listener: AuthListener) -> AuthSubscription;
}
