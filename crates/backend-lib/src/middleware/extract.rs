//! Request extractors backed by the session cookie.
use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::auth::{AuthRedirect, SessionAuthenticator};

/// The signed-in user's id. Rejects with a redirect to the login page that
/// remembers the requested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUserId(pub String);

impl<S> FromRequestParts<S> for CurrentUserId
where
    SessionAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = SessionAuthenticator::from_ref(state);
        auth.require_user_id(parts, None).map(CurrentUserId)
    }
}

/// The signed-in user's id, if any. Never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaybeUserId(pub Option<String>);

impl<S> FromRequestParts<S> for MaybeUserId
where
    SessionAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = SessionAuthenticator::from_ref(state);
        Ok(MaybeUserId(auth.get_user_id(&parts.headers)))
    }
}
