// ============================
// jokes-backend-lib/src/lib.rs
// ============================
//! Cookie-session authentication for the Jokes web application.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{hasher_from_settings, SessionAuthenticator, SessionConfig};
use crate::config::Settings;
use crate::error::AppError;
use crate::storage::{CredentialStore, FlatFileStore};

/// Application state shared across all handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    /// Session authenticator
    pub auth: SessionAuthenticator,
    /// Settings the process started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create application state over an explicit credential store.
    /// Fails if the settings carry no session secret.
    pub fn new(settings: Settings, store: Arc<dyn CredentialStore>) -> Result<Self, AppError> {
        let session_config = SessionConfig::from_settings(&settings)?;
        let hasher = hasher_from_settings(&settings.password);
        let auth = SessionAuthenticator::new(session_config, store, hasher);

        Ok(Self {
            auth,
            settings: Arc::new(settings),
        })
    }

    /// Create application state backed by the flat-file store in `data_dir`
    pub fn from_settings(settings: Settings) -> Result<Self, AppError> {
        let store = Arc::new(FlatFileStore::new(&settings.data_dir)?);
        Self::new(settings, store)
    }
}
