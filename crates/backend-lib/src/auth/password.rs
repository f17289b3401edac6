// ============================
// jokes-backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Both schemes are CPU bound, so hashing and verification run on the
//! blocking thread pool instead of stalling the async executor.
use async_trait::async_trait;
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Scrypt,
};
use tracing::warn;

use crate::config::{PasswordScheme, PasswordSettings};
use crate::error::AppError;

/// One-way salted password hashing
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password with a fresh salt
    async fn hash(&self, plain: &str) -> Result<String, AppError>;

    /// Check a plaintext password against a stored hash.
    /// A malformed hash never matches.
    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, AppError>;
}

/// bcrypt with a fixed work factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BCRYPT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plain: &str) -> Result<String, AppError> {
        let plain = zeroize::Zeroizing::new(plain.to_owned());
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain.as_str(), cost))
            .await?
            .map_err(|e| AppError::Hash(e.to_string()))
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, AppError> {
        let plain = zeroize::Zeroizing::new(plain.to_owned());
        let hash = hash.to_owned();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain.as_str(), &hash)).await?;
        match outcome {
            Ok(valid) => Ok(valid),
            Err(e) => {
                warn!(error = %e, "stored bcrypt hash could not be parsed");
                Ok(false)
            }
        }
    }
}

/// scrypt in PHC string format
#[derive(Debug, Clone, Copy, Default)]
pub struct ScryptHasher;

/// Hash a password using scrypt
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AppError::Hash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Verify a password against an scrypt hash
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

#[async_trait]
impl PasswordHasher for ScryptHasher {
    async fn hash(&self, plain: &str) -> Result<String, AppError> {
        let plain = zeroize::Zeroizing::new(plain.to_owned());
        tokio::task::spawn_blocking(move || hash_password(plain.as_str())).await?
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, AppError> {
        let plain = zeroize::Zeroizing::new(plain.to_owned());
        let hash = hash.to_owned();
        Ok(tokio::task::spawn_blocking(move || verify_password(&hash, plain.as_str())).await?)
    }
}

/// Build the hasher selected in settings
pub fn hasher_from_settings(settings: &PasswordSettings) -> std::sync::Arc<dyn PasswordHasher> {
    match settings.scheme {
        PasswordScheme::Bcrypt => std::sync::Arc::new(BcryptHasher::new(settings.bcrypt_cost)),
        PasswordScheme::Scrypt => std::sync::Arc::new(ScryptHasher),
    }
}
