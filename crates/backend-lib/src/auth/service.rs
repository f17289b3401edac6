//! The session authenticator: login, registration and session-derived identity.
use std::sync::Arc;

use axum::http::{request::Parts, HeaderMap};
use jokes_common::UserRef;
use metrics::counter;
use tracing::{debug, error, info, instrument};

use super::{AuthRedirect, Credentials, PasswordHasher, Session, SessionCodec, SessionConfig, LOGIN_PATH};
use crate::error::AppError;
use crate::metrics::{FORCED_LOGOUT, LOGIN_FAILURE, LOGIN_SUCCESS, REGISTER, SESSION_CREATED, SESSION_DESTROYED};
use crate::storage::CredentialStore;

/// Cookie-session authentication over a credential store and a password hasher.
///
/// Holds no mutable state; clones share the same store, hasher and codec.
#[derive(Clone)]
pub struct SessionAuthenticator {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: SessionCodec,
}

impl SessionAuthenticator {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            hasher,
            codec: SessionCodec::new(config),
        }
    }

    /// Check a username/password pair. Unknown users and wrong passwords are
    /// `Ok(None)`; only store or hasher failures are errors.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<UserRef>, AppError> {
        let Some(user) = self.store.find_by_username(&credentials.username).await? else {
            debug!("login for unknown username");
            counter!(LOGIN_FAILURE).increment(1);
            return Ok(None);
        };

        if !self.hasher.verify(&credentials.password, &user.password_hash).await? {
            debug!("password did not match");
            counter!(LOGIN_FAILURE).increment(1);
            return Ok(None);
        }

        counter!(LOGIN_SUCCESS).increment(1);
        info!(user_id = %user.id, "user logged in");
        Ok(Some(UserRef {
            id: user.id,
            username: credentials.username.clone(),
        }))
    }

    /// Hash the password and create the user. Duplicate usernames surface as
    /// [`AppError::UsernameTaken`] from the store.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(&self, credentials: &Credentials) -> Result<UserRef, AppError> {
        let password_hash = self.hasher.hash(&credentials.password).await?;
        let user = self
            .store
            .create_user(&credentials.username, &password_hash)
            .await?;

        counter!(REGISTER).increment(1);
        info!(user_id = %user.id, "user registered");
        Ok(user.to_ref())
    }

    /// Start a session for `user_id` and redirect to `redirect_to`.
    /// The user id is not checked against the store.
    pub fn create_user_session(&self, user_id: &str, redirect_to: &str) -> Result<AuthRedirect, AppError> {
        let mut session = Session::new();
        session.set_user_id(user_id);
        let set_cookie = self.codec.commit(&session)?;

        counter!(SESSION_CREATED).increment(1);
        debug!(user_id, redirect_to, "session created");
        Ok(AuthRedirect::to(redirect_to).with_cookie(set_cookie))
    }

    /// The session carried by the request; empty when absent or invalid
    pub fn get_user_session(&self, headers: &HeaderMap) -> Session {
        self.codec.parse(headers)
    }

    pub fn get_user_id(&self, headers: &HeaderMap) -> Option<String> {
        self.get_user_session(headers).user_id().map(str::to_owned)
    }

    /// The signed-in user id, or a redirect to the login page that remembers
    /// `redirect_to` (the request path when `None`).
    pub fn require_user_id(&self, parts: &Parts, redirect_to: Option<&str>) -> Result<String, AuthRedirect> {
        match self.get_user_id(&parts.headers) {
            Some(user_id) => Ok(user_id),
            None => {
                let redirect_to = redirect_to.unwrap_or_else(|| parts.uri.path());
                debug!(redirect_to, "unauthenticated request");
                Err(AuthRedirect::login(redirect_to))
            }
        }
    }

    /// Resolve the signed-in user. A user id with no matching record gives
    /// `Ok(None)`; a failing store forces a logout instead of surfacing the error.
    pub async fn get_user(&self, headers: &HeaderMap) -> Result<Option<UserRef>, AuthRedirect> {
        let Some(user_id) = self.get_user_id(headers) else {
            return Ok(None);
        };

        match self.store.find_by_id(&user_id).await {
            Ok(user) => Ok(user.map(|user| user.to_ref())),
            Err(err) => {
                error!(%user_id, error = %err, "user lookup failed, forcing logout");
                counter!(FORCED_LOGOUT).increment(1);
                Err(self
                    .logout(headers)
                    .unwrap_or_else(|_| AuthRedirect::to(LOGIN_PATH)))
            }
        }
    }

    /// Clear the session cookie and redirect to the login page
    pub fn logout(&self, headers: &HeaderMap) -> Result<AuthRedirect, AppError> {
        let session = self.get_user_session(headers);
        let set_cookie = self.codec.destroy()?;

        counter!(SESSION_DESTROYED).increment(1);
        debug!(had_user = session.user_id().is_some(), "session destroyed");
        Ok(AuthRedirect::to(LOGIN_PATH).with_cookie(set_cookie))
    }
}
