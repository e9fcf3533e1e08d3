//! Auth orchestrator: composes the token codec, the session store, and
//! the user-authentication capability into the login/refresh/logout
//! lifecycle.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::errors::AuthError;
use super::password::UserAuthenticator;
use crate::db::{Database, Session};
use crate::jwt::{JwtConfig, unix_now};

/// Tokens handed out by a successful login.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds
    pub expires_in: u64,
}

/// Result of exchanging a refresh secret for a new access token.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Access-token lifetime in seconds
    pub expires_in: u64,
}

/// Rows reclaimed by one cleanup pass.
#[derive(Debug, Clone, Copy)]
pub struct CleanupReport {
    pub sessions: u64,
    pub blacklist: u64,
}

/// Orchestrates the session/token lifecycle.
///
/// Each method is a single transition; there is no long-lived state
/// beyond the injected collaborators.
pub struct AuthService {
    db: Database,
    jwt: Arc<JwtConfig>,
    users: Arc<dyn UserAuthenticator>,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(
        db: Database,
        jwt: Arc<JwtConfig>,
        users: Arc<dyn UserAuthenticator>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            db,
            jwt,
            users,
            refresh_ttl,
        }
    }

    /// Authenticate credentials, mint an access token, and persist a new
    /// session holding a fresh refresh secret.
    ///
    /// If the session cannot be persisted the whole call fails: a token
    /// is never returned without a stored session behind its refresh
    /// secret.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<LoginTokens, AuthError> {
        let identity = self.users.authenticate(email, password).await?;

        let issued = self
            .jwt
            .issue_access_token(&identity.user_id, &identity.email)?;
        let refresh_secret = self.jwt.issue_refresh_secret()?;

        self.db
            .sessions()
            .create(
                &identity.user_id,
                &refresh_secret,
                user_agent,
                ip_address,
                self.refresh_ttl.as_secs(),
            )
            .await?;

        Ok(LoginTokens {
            access_token: issued.token,
            refresh_token: refresh_secret,
            expires_in: issued.expires_in,
        })
    }

    /// Exchange a refresh secret for a new access token.
    ///
    /// The refresh secret is not rotated: the same secret stays valid
    /// until it expires or logout deletes it. A secret that was logged
    /// out resolves exactly like one that never existed.
    pub async fn refresh(
        &self,
        refresh_secret: &str,
        _user_agent: Option<&str>,
        _ip_address: Option<&str>,
    ) -> Result<RefreshedToken, AuthError> {
        if refresh_secret.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let session = self
            .db
            .sessions()
            .find_by_refresh_secret(refresh_secret)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        // Best-effort: a failed touch must not abort the refresh.
        if let Err(e) = self.db.sessions().touch(&session.uuid).await {
            warn!(session = %session.uuid, error = %e, "Failed to update session last-used time");
        }

        // Sessions do not record the email; the user id is the
        // authoritative identity on refreshed tokens.
        let issued = self.jwt.issue_access_token(&session.user_id, "")?;

        Ok(RefreshedToken {
            access_token: issued.token,
            expires_in: issued.expires_in,
        })
    }

    /// End one session and neutralize its presented access token.
    ///
    /// Deleting the session is idempotent; a refresh secret that no
    /// longer resolves is not an error. When the caller supplies the
    /// access token's jti it is blacklisted with the token's expiry
    /// horizon, so the entry dies with the token it neutralizes.
    pub async fn logout(
        &self,
        refresh_secret: &str,
        access_token_jti: Option<&str>,
        user_id: &str,
    ) -> Result<(), AuthError> {
        self.db
            .sessions()
            .delete_by_refresh_secret(refresh_secret)
            .await?;

        if let Some(jti) = access_token_jti {
            let expires_at = unix_now()? + self.jwt.access_ttl_secs();
            self.db
                .blacklist()
                .insert(jti, user_id, expires_at, Some("user logout"))
                .await?;
        }

        Ok(())
    }

    /// Delete every session owned by a user. Returns the count deleted.
    ///
    /// Outstanding access tokens are not individually blacklisted; they
    /// age out on their own short TTL.
    pub async fn logout_all(&self, user_id: &str) -> Result<u64, AuthError> {
        Ok(self.db.sessions().delete_all_for_user(user_id).await?)
    }

    /// Blacklist a token identifier outside the logout flow.
    pub async fn revoke_token(
        &self,
        jti: &str,
        user_id: &str,
        reason: Option<&str>,
    ) -> Result<(), AuthError> {
        let expires_at = unix_now()? + self.jwt.access_ttl_secs();
        self.db
            .blacklist()
            .insert(jti, user_id, expires_at, reason)
            .await?;
        Ok(())
    }

    /// List a user's active sessions.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, AuthError> {
        Ok(self.db.sessions().list_active_for_user(user_id).await?)
    }

    /// Sweep expired sessions, then expired blacklist entries.
    ///
    /// The blacklist sweep only runs if the session sweep succeeded; a
    /// session-sweep failure is surfaced to the caller rather than
    /// swallowed.
    pub async fn cleanup_expired(&self) -> Result<CleanupReport, AuthError> {
        let sessions = self.db.sessions().delete_expired().await?;
        let blacklist = self.db.blacklist().delete_expired().await?;
        Ok(CleanupReport {
            sessions,
            blacklist,
        })
    }
}
