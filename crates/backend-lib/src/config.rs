// ============================
// jokes-backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are read once at startup and never change afterwards. Sources are
//! merged in order: built-in defaults, a TOML file, `JOKES_`-prefixed
//! environment variables, then the bare `SESSION_SECRET` and `NODE_ENV`.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "jokes.toml";

/// Default session cookie name
pub const DEFAULT_COOKIE_NAME: &str = "Jokes_session";

/// Default session lifetime (30 days)
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

/// Default bcrypt work factor
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Environment variable holding the cookie signing secret
pub const SESSION_SECRET_VAR: &str = "SESSION_SECRET";

/// Environment variable naming the deployment environment
pub const NODE_ENV_VAR: &str = "NODE_ENV";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Errors raised while building configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Session secret is required (set SESSION_SECRET)")]
    MissingSessionSecret,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path for the flat-file credential store
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Deployment environment, `production` turns on secure cookies
    pub environment: String,
    /// Session cookie settings
    #[serde(default)]
    pub session: SessionSettings,
    /// Password hashing settings
    #[serde(default)]
    pub password: PasswordSettings,
}

/// Session cookie settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Secret used to sign new cookies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Older secrets still accepted when verifying cookies
    pub previous_secrets: Vec<String>,
    /// Cookie name
    pub cookie_name: String,
    /// Force the `Secure` attribute; derived from the environment when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// `SameSite` attribute
    pub same_site: SameSitePolicy,
    /// Cookie path
    pub path: String,
    /// Cookie `Max-Age` in seconds
    pub max_age_secs: u64,
    /// `HttpOnly` attribute
    pub http_only: bool,
}

/// `SameSite` cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

/// Password hashing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    /// Algorithm used for newly registered users
    pub scheme: PasswordScheme,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

/// Supported password hashing schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    Bcrypt,
    Scrypt,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            environment: "development".to_string(),
            session: SessionSettings::default(),
            password: PasswordSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: None,
            previous_secrets: Vec::new(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure: None,
            same_site: SameSitePolicy::Lax,
            path: "/".to_string(),
            max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            http_only: true,
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            scheme: PasswordScheme::Bcrypt,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("previous_secrets", &self.previous_secrets.len())
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .field("same_site", &self.same_site)
            .field("path", &self.path)
            .field("max_age_secs", &self.max_age_secs)
            .field("http_only", &self.http_only)
            .finish()
    }
}

impl Settings {
    /// Build the figment that `load` extracts from.
    ///
    /// Secrets and `NODE_ENV` are taken verbatim, never parsed as TOML values.
    pub fn figment(config_file: impl AsRef<Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file.as_ref()))
            .merge(
                Env::prefixed("JOKES_")
                    .split("__")
                    .ignore(&["session.secret"]),
            );

        for var in ["JOKES_SESSION__SECRET", SESSION_SECRET_VAR] {
            if let Some(secret) = raw_env(var) {
                figment = figment.merge(Serialized::default("session.secret", secret));
            }
        }
        if let Some(environment) = raw_env(NODE_ENV_VAR) {
            figment = figment.merge(Serialized::default("environment", environment));
        }
        figment
    }

    /// Load settings from `jokes.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from an explicit config file and the environment
    pub fn load_from(config_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(config_file)
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("cookie name must not be empty".to_string()));
        }
        if !self.session.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "cookie path '{}' must start with '/'",
                self.session.path
            )));
        }
        if self.session.max_age_secs == 0 {
            return Err(ConfigError::Invalid("session max age must be positive".to_string()));
        }
        if !(4..=31).contains(&self.password.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt cost {} outside 4..=31",
                self.password.bcrypt_cost
            )));
        }
        Ok(())
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Effective `Secure` cookie attribute
    pub fn cookie_secure(&self) -> bool {
        self.session.secure.unwrap_or_else(|| self.is_production())
    }
}

fn raw_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
