// ============================
// jokes-backend-lib/src/auth/session.rs
// ============================
//! Signed cookie sessions.
//!
//! A session is a small JSON map kept entirely on the client. It is encoded as
//! URL-safe base64 and signed with HMAC-SHA256 through the `cookie` crate's
//! signed jar, so the client can read it but not forge or alter it.
use std::fmt;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{time::Duration, Cookie, CookieBuilder, CookieJar, Key, SameSite};
use jokes_common::SESSION_USER_ID_KEY;
use serde_json::{Map, Value};
use sha2::{Digest, Sha512};
use tracing::debug;

use crate::config::{ConfigError, SameSitePolicy, Settings};
use crate::error::AppError;

/// Client-side session data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    data: Map<String, Value>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The signed-in user, if `userId` holds a non-empty string
    pub fn user_id(&self) -> Option<&str> {
        match self.data.get(SESSION_USER_ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.set(SESSION_USER_ID_KEY, Value::String(user_id.into()));
    }
}

/// Immutable cookie settings, built once at startup
#[derive(Clone)]
pub struct SessionConfig {
    signing_key: Key,
    verify_keys: Vec<Key>,
    cookie_name: String,
    secure: bool,
    same_site: SameSite,
    path: String,
    max_age: Duration,
    http_only: bool,
}

impl SessionConfig {
    /// Build the cookie configuration. Fails when no session secret is set.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let session = &settings.session;
        let secret = session
            .secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSessionSecret)?;

        let signing_key = derive_key(secret)?;
        let mut verify_keys = vec![signing_key.clone()];
        for previous in session.previous_secrets.iter().filter(|s| !s.trim().is_empty()) {
            verify_keys.push(derive_key(previous)?);
        }

        let max_age = i64::try_from(session.max_age_secs)
            .map(Duration::seconds)
            .map_err(|_| ConfigError::Invalid("session max age is too large".to_string()))?;

        HeaderValue::from_str(&session.cookie_name).map_err(|_| {
            ConfigError::Invalid(format!("cookie name '{}' is not header-safe", session.cookie_name))
        })?;

        Ok(Self {
            signing_key,
            verify_keys,
            cookie_name: session.cookie_name.clone(),
            secure: settings.cookie_secure(),
            same_site: match session.same_site {
                SameSitePolicy::Strict => SameSite::Strict,
                SameSitePolicy::Lax => SameSite::Lax,
                SameSitePolicy::None => SameSite::None,
            },
            path: session.path.clone(),
            max_age,
            http_only: session.http_only,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn same_site(&self) -> SameSite {
        self.same_site
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("keys", &self.verify_keys.len())
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .field("same_site", &self.same_site)
            .field("path", &self.path)
            .field("max_age", &self.max_age)
            .field("http_only", &self.http_only)
            .finish()
    }
}

/// Stretch an arbitrary-length secret to the 64 bytes `Key` needs
fn derive_key(secret: &str) -> Result<Key, ConfigError> {
    let digest = Sha512::digest(secret.as_bytes());
    Key::try_from(digest.as_slice())
        .map_err(|e| ConfigError::Invalid(format!("unusable session secret: {e}")))
}

/// Turns sessions into `Set-Cookie` values and `Cookie` headers back into sessions
#[derive(Debug, Clone)]
pub struct SessionCodec {
    config: Arc<SessionConfig>,
}

impl SessionCodec {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read the session from the request's `Cookie` headers.
    /// Missing, unsigned, tampered or undecodable cookies give an empty session.
    pub fn parse(&self, headers: &HeaderMap) -> Session {
        let Some(raw) = self.find_cookie(headers) else {
            return Session::new();
        };

        let mut jar = CookieJar::new();
        jar.add_original(raw);

        let verified = self
            .config
            .verify_keys
            .iter()
            .find_map(|key| jar.signed(key).get(&self.config.cookie_name));

        match verified {
            Some(cookie) => decode_payload(cookie.value()).unwrap_or_else(|| {
                debug!("session cookie payload could not be decoded");
                Session::new()
            }),
            None => {
                debug!("session cookie failed signature check");
                Session::new()
            }
        }
    }

    /// Serialize and sign a session into a `Set-Cookie` value
    pub fn commit(&self, session: &Session) -> Result<HeaderValue, AppError> {
        let payload = serde_json::to_vec(&session.data)?;
        let cookie = self
            .base_cookie(URL_SAFE_NO_PAD.encode(payload))
            .max_age(self.config.max_age)
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.config.signing_key).add(cookie);
        let signed = jar
            .get(&self.config.cookie_name)
            .ok_or_else(|| AppError::Internal("signed session cookie missing".to_string()))?;

        to_header_value(signed)
    }

    /// A `Set-Cookie` value that clears the session cookie
    pub fn destroy(&self) -> Result<HeaderValue, AppError> {
        let mut cookie = self.base_cookie(String::new()).build();
        cookie.make_removal();
        to_header_value(&cookie)
    }

    fn base_cookie(&self, value: String) -> CookieBuilder<'static> {
        Cookie::build((self.config.cookie_name.clone(), value))
            .path(self.config.path.clone())
            .secure(self.config.secure)
            .http_only(self.config.http_only)
            .same_site(self.config.same_site)
    }

    fn find_cookie(&self, headers: &HeaderMap) -> Option<Cookie<'static>> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.config.cookie_name)
            .map(Cookie::into_owned)
    }
}

fn decode_payload(value: &str) -> Option<Session> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    let data: Map<String, Value> = serde_json::from_slice(&bytes).ok()?;
    Some(Session { data })
}

fn to_header_value(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(format!("invalid Set-Cookie value: {e}")))
}
