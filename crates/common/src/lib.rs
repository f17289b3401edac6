// ================
// common/src/lib.rs
// ================
//! Common types shared between the Jokes backend and its clients.
//! This module defines the user shapes and form payloads that cross the HTTP boundary.

use serde::{Deserialize, Serialize};

/// Key under which the authenticated user's id is stored in the session
pub const SESSION_USER_ID_KEY: &str = "userId";

/// Query parameter carrying the page to return to after logging in
pub const REDIRECT_TO_PARAM: &str = "redirectTo";

/// Public view of a user. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Unique, immutable user id
    pub id: String,
    /// Unique username
    pub username: String,
}

/// Which action the login form asks for
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    #[default]
    Login,
    Register,
}

/// Body of the `POST /login` form
/// # Fields
/// * `login_type` - `login` or `register`
/// * `username` - Account name
/// * `password` - Plaintext password, hashed before storage
/// * `redirect_to` - Same-site path to land on afterwards
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[serde(default)]
    pub login_type: LoginType,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("login_type", &self.login_type)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("redirect_to", &self.redirect_to)
            .finish()
    }
}

/// Field-level problems reported back to the login form
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Echo of the submitted form, minus the password
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedFields {
    pub login_type: LoginType,
    pub username: String,
}

/// Body returned when a login or registration attempt is rejected
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginActionData {
    #[serde(default)]
    pub field_errors: FieldErrors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_error: Option<String>,
    pub fields: SubmittedFields,
}
