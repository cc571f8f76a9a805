//! In-memory auth provider for tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use tripmate_core::{Listeners, UserId};

use crate::error::{AuthError, Result};
use crate::{AuthListener, AuthProvider, AuthSubscription, User};

/// A mock auth provider.
///
/// Issues tokens of the form `test-token:<uid>` for whoever is signed in.
#[derive(Default)]
pub struct MockAuthProvider {
    user: RwLock<Option<User>>,
    listeners: Listeners<Option<User>>,
}

impl MockAuthProvider {
    /// A provider with `uid` signed in.
    ///
    /// # Panics
    ///
    /// Panics if `uid` is not a valid user ID.
    #[must_use]
    pub fn signed_in(uid: &str) -> Self {
        let provider = Self::default();
        provider.sign_in(User {
            uid: UserId::new(uid).expect("valid test user id"),
            email: None,
            display_name: None,
        });
        provider
    }

    /// Sign `user` in and notify listeners.
    pub fn sign_in(&self, user: User) {
        let user = Some(user);
        self.user.write().clone_from(&user);
        self.listeners.notify(&user);
    }

    /// Sign out and notify listeners.
    pub fn sign_out(&self) {
        *self.user.write() = None;
        self.listeners.notify(&None);
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    async fn id_token(&self, user: &User) -> Result<String> {
        match self.user.read().as_ref() {
            Some(current) if current.uid == user.uid => Ok(format!("test-token:{}", user.uid)),
            Some(_) => Err(AuthError::UserMismatch),
            None => Err(AuthError::NotSignedIn),
        }
    }

    fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        listener(&self.current_user());
        self.listeners.add(listener)
    }
}
