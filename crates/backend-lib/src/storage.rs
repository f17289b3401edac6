// ============================
// jokes-backend-lib/src/storage.rs
// ============================
//! Credential storage abstraction with flat-file and in-memory implementations.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jokes_common::UserRef;
use serde::{Deserialize, Serialize};
use tokio::fs as tokio_fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;

/// A stored user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    fn new(username: &str, password_hash: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Public view without the password hash
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            username: self.username.clone(),
        }
    }
}

/// Trait for credential storage backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look a user up by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Look a user up by id
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Persist a new user. Fails with [`AppError::UsernameTaken`] if the
    /// username already exists.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;
}

/// Flat-file implementation of the `CredentialStore` trait.
///
/// Layout under the root directory:
/// - `users/<id>.json` holds the user record
/// - `usernames/<base64url(username)>` holds the id; it is written to a
///   pending file and hard-linked into place, so two registrations cannot
///   claim the same name and a crash never leaves a half-written claim
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    root: PathBuf,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, AppError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("users"))?;
        std::fs::create_dir_all(root.join("usernames"))?;
        Ok(Self { root })
    }

    fn user_path(&self, id: &str) -> PathBuf {
        self.root.join("users").join(format!("{id}.json"))
    }

    /// Index contents staged before being linked into place. The `.` keeps it
    /// apart from base64url index names.
    fn pending_index_path(&self, id: &str) -> PathBuf {
        self.root.join("usernames").join(format!("{id}.pending"))
    }

    fn username_path(&self, username: &str) -> PathBuf {
        self.root
            .join("usernames")
            .join(URL_SAFE_NO_PAD.encode(username.as_bytes()))
    }
}

fn store_error(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Store(format!("{context}: {err}"))
}

#[async_trait]
impl CredentialStore for FlatFileStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let id = match tokio_fs::read_to_string(self.username_path(username)).await {
            Ok(id) => id,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error("failed to read username index", e)),
        };

        let user = self.find_by_id(id.trim()).await?;
        if user.is_none() {
            warn!(username, "username index points at a missing user record");
        }
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        // Ids come from cookies; only well-formed uuids map to file names
        if Uuid::parse_str(id).is_err() {
            debug!(id, "lookup with malformed user id");
            return Ok(None);
        }

        let bytes = match tokio_fs::read(self.user_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error("failed to read user record", e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| store_error("corrupt user record", e))
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let user = User::new(username, password_hash);
        let user_path = self.user_path(&user.id);
        let pending_path = self.pending_index_path(&user.id);
        let index_path = self.username_path(username);

        let record = serde_json::to_vec_pretty(&user)?;
        let written = async {
            tokio_fs::write(&user_path, &record).await?;
            tokio_fs::write(&pending_path, user.id.as_bytes()).await?;
            // Linking fails if the name exists, so the index only ever appears complete
            tokio_fs::hard_link(&pending_path, &index_path).await
        }
        .await;
        let _ = tokio_fs::remove_file(&pending_path).await;

        match written {
            Ok(()) => Ok(user),
            Err(e) => {
                let _ = tokio_fs::remove_file(&user_path).await;
                if e.kind() == ErrorKind::AlreadyExists {
                    Err(AppError::UsernameTaken(username.to_string()))
                } else {
                    Err(store_error("failed to write user record", e))
                }
            }
        }
    }
}

/// In-memory implementation of the `CredentialStore` trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    usernames: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let id = match self.usernames.get(username) {
            Some(id) => id.value().clone(),
            None => return Ok(None),
        };
        self.find_by_id(&id).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|user| user.value().clone()))
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let user = User::new(username, password_hash);
        let mut claimed = false;
        {
            let _entry = self
                .usernames
                .entry(username.to_string())
                .or_insert_with(|| {
                    claimed = true;
                    user.id.clone()
                });
        }
        if !claimed {
            return Err(AppError::UsernameTaken(username.to_string()));
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}
