//! Login credentials.
use std::fmt;

use jokes_common::LoginForm;
use zeroize::Zeroizing;

/// A username/password pair. The password is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl From<LoginForm> for Credentials {
    fn from(form: LoginForm) -> Self {
        Self::new(form.username, form.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
