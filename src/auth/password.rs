//! The "authenticate user" capability and its password-backed default.
//!
//! The orchestrator only sees the [`UserAuthenticator`] trait; the
//! bundled implementation verifies Argon2id PHC hashes from the user
//! store.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;

use super::errors::AuthError;
use crate::db::UserStore;

/// Identity returned by a successful authentication.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
}

/// Capability consumed by the auth orchestrator to verify credentials.
#[async_trait]
pub trait UserAuthenticator: Send + Sync {
    /// Authenticate an email/password pair.
    ///
    /// Fails with [`AuthError::UserNotFound`] when no account exists and
    /// [`AuthError::InvalidCredentials`] on a password mismatch.
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError>;
}

/// Default [`UserAuthenticator`] backed by the user store.
pub struct PasswordAuthenticator {
    users: UserStore,
}

impl PasswordAuthenticator {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserAuthenticator for PasswordAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(UserIdentity {
            user_id: user.uuid,
            email: user.email,
        })
    }
}

/// Hash a plaintext password using Argon2id with a random salt.
/// Returns the PHC-formatted hash string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
/// An unparseable hash verifies as false.
fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
