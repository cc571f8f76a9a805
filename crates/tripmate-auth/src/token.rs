//! Bearer ID token provider.
//!
//! The token is issued by the identity service and verified by the backend;
//! this side only reads its claims to know who is signed in and when the
//! token stops being usable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use tripmate_core::{Listeners, UserId};

use crate::error::{AuthError, Result};
use crate::{AuthListener, AuthProvider, AuthSubscription, User};

/// Raw claims read from an ID token.
#[derive(Debug, Deserialize)]
struct RawClaims {
    /// Subject (the user ID).
    #[serde(default)]
    sub: Option<String>,
    /// Alternate user ID claim used by some issuers.
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    /// Expiration timestamp.
    exp: u64,
}

/// Decode the claims of an ID token without verifying its signature.
///
/// # Errors
///
/// Returns `AuthError::TokenExpired` if `exp` is in the past,
/// `AuthError::MissingClaim` if neither `sub` nor `user_id` is present, and
/// `AuthError::InvalidToken` if the token cannot be parsed.
pub fn decode_claims(token: &str) -> Result<(User, DateTime<Utc>)> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::MissingClaim(claim.clone())
            }
            _ => AuthError::InvalidToken(e.to_string()),
        })?;
    let claims = token_data.claims;

    let uid = claims
        .sub
        .or(claims.user_id)
        .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;
    let uid = UserId::new(uid).map_err(|_| AuthError::InvalidUserId)?;

    let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
    let expires_at = DateTime::from_timestamp(exp_secs, 0)
        .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

    Ok((
        User {
            uid,
            email: claims.email,
            display_name: claims.name,
        },
        expires_at,
    ))
}

struct Session {
    token: String,
    user: User,
    expires_at: DateTime<Utc>,
}

/// Auth provider backed by a bearer ID token supplied by the caller.
#[derive(Default)]
pub struct TokenAuthProvider {
    session: RwLock<Option<Session>>,
    listeners: Listeners<Option<User>>,
}

impl TokenAuthProvider {
    /// Create a provider with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider signed in with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or has expired.
    pub fn from_token(token: impl Into<String>) -> Result<Self> {
        let provider = Self::new();
        provider.set_token(token)?;
        Ok(provider)
    }

    /// Sign in with a new token, replacing the current one.
    ///
    /// Listeners are notified with the new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or has expired; the
    /// current session is left untouched in that case.
    pub fn set_token(&self, token: impl Into<String>) -> Result<User> {
        let token = token.into();
        let (user, expires_at) = decode_claims(&token)?;

        *self.session.write() = Some(Session {
            token,
            user: user.clone(),
            expires_at,
        });
        tracing::info!(uid = %user.uid, %expires_at, "Signed in");

        self.listeners.notify(&Some(user.clone()));
        Ok(user)
    }

    /// Sign out. Listeners are notified if someone was signed in.
    pub fn sign_out(&self) {
        let previous = self.session.write().take();
        if let Some(session) = previous {
            tracing::info!(uid = %session.user.uid, "Signed out");
            self.listeners.notify(&None);
        }
    }

    /// When the current token expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.read().as_ref().map(|s| s.expires_at)
    }
}

#[async_trait]
impl AuthProvider for TokenAuthProvider {
    fn current_user(&self) -> Option<User> {
        self.session.read().as_ref().map(|s| s.user.clone())
    }

    async fn id_token(&self, user: &User) -> Result<String> {
        let session = self.session.read();
        let session = session.as_ref().ok_or(AuthError::NotSignedIn)?;
        if session.user.uid != user.uid {
            return Err(AuthError::UserMismatch);
        }
        if Utc::now() >= session.expires_at {
            tracing::debug!(uid = %user.uid, "ID token expired");
            return Err(AuthError::TokenExpired);
        }
        Ok(session.token.clone())
    }

    fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        listener(&self.current_user());
        self.listeners.add(listener)
    }
}
