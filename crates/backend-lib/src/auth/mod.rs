// ============================
// jokes-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod credentials;
pub mod password;
pub mod redirect;
pub mod session;
mod service;

pub use credentials::Credentials;
pub use password::{hasher_from_settings, BcryptHasher, PasswordHasher, ScryptHasher};
pub use redirect::{login_url, safe_redirect, AuthRedirect, LOGIN_PATH};
pub use session::{Session, SessionCodec, SessionConfig};
pub use service::SessionAuthenticator;
