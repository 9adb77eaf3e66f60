//! User credential store.
//!
//! # Responsibilities
//! - Register users with a unique username and an Argon2id password hash
//! - Verify username/password pairs without revealing which part was wrong
//!
//! # Design Decisions
//! - In-memory `DashMap` keyed by username; the entry API makes the
//!   duplicate check and insert one step
//! - Hashing runs on the blocking pool, never under a map lock
//! - Unknown usernames are checked against a dummy hash so both failure
//!   paths cost the same

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;
use uuid::Uuid;

const MAX_USERNAME_LEN: usize = 64;
const MAX_PASSWORD_LEN: usize = 128;

/// Errors returned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("username already exists")]
    DuplicateUsername,
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// A registered user. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: u64,
}

/// The externally visible part of a user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

/// Length limits applied at registration.
#[derive(Debug, Clone, Copy)]
pub struct CredentialPolicy {
    pub min_username_len: usize,
    pub min_password_len: usize,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            min_username_len: 3,
            min_password_len: 6,
        }
    }
}

/// Thread-safe store of registered users.
#[derive(Debug)]
pub struct CredentialStore {
    users: DashMap<String, Arc<User>>,
    policy: CredentialPolicy,
    dummy_hash: String,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new(policy: CredentialPolicy) -> Result<Self, CredentialError> {
        let dummy_hash = hash_password(&Uuid::new_v4().to_string())?;
        Ok(Self {
            users: DashMap::new(),
            policy,
            dummy_hash,
        })
    }

    /// Register a new user.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, CredentialError> {
        let username = self.validate(username, password)?;

        // Cheap early rejection; the entry check below is authoritative.
        if self.users.contains_key(&username) {
            return Err(CredentialError::DuplicateUsername);
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))??;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.clone(),
            password_hash,
            created_at: now_secs(),
        };

        match self.users.entry(username) {
            Entry::Occupied(_) => Err(CredentialError::DuplicateUsername),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(user.clone()));
                tracing::info!(user_id = %user.id, username = %user.username, "User registered");
                Ok(user)
            }
        }
    }

    /// Check a username/password pair.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User, CredentialError> {
        let user = self.users.get(username.trim()).map(|r| r.value().clone());
        let hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))??;

        match user {
            Some(user) if matches => Ok(user.as_ref().clone()),
            _ => Err(CredentialError::InvalidCredentials),
        }
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn validate(&self, username: &str, password: &str) -> Result<String, CredentialError> {
        let username = username.trim();
        let name_len = username.chars().count();
        if name_len < self.policy.min_username_len || name_len > MAX_USERNAME_LEN {
            return Err(CredentialError::InvalidInput(format!(
                "username must be between {} and {} characters",
                self.policy.min_username_len, MAX_USERNAME_LEN
            )));
        }
        if username.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(CredentialError::InvalidInput(
                "username must not contain whitespace or control characters".to_string(),
            ));
        }

        let pass_len = password.chars().count();
        if pass_len < self.policy.min_password_len || pass_len > MAX_PASSWORD_LEN {
            return Err(CredentialError::InvalidInput(format!(
                "password must be between {} and {} characters",
                self.policy.min_password_len, MAX_PASSWORD_LEN
            )));
        }

        Ok(username.to_string())
    }
}

/// Hash a password with Argon2id and a random salt, in PHC string format.
fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Verify a password against a stored PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(hash).map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
