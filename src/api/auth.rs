//! Authentication API endpoints.
//!
//! - POST `/login` - Exchange credentials for access + refresh tokens
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - POST `/logout` - Delete the session and blacklist the access token
//! - POST `/logout-all` - Delete every session for the caller
//! - GET `/sessions` - List the caller's active sessions
//! - POST `/revoke` - Blacklist a token identifier explicitly

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{HeaderMap, header, request::Parts},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, AuthError, AuthService};
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::jwt::{AccessClaims, JwtConfig, JwtError};

#[derive(Clone)]
pub struct AuthApiState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub auth: Arc<AuthService>,
}

impl_has_auth_state!(AuthApiState);

pub fn router(state: AuthApiState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/sessions", get(list_sessions))
        .route("/revoke", post(revoke))
        .with_state(state)
}

/// Informational request metadata recorded on sessions.
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Ok(ClientMeta {
            user_agent,
            ip_address: extract_client_ip(parts),
        })
    }
}

/// Extract the client IP: first X-Forwarded-For entry when behind a
/// proxy, otherwise the peer address.
fn extract_client_ip(parts: &Parts) -> Option<String> {
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    if let Some(forwarded_for) = parts.headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

/// Log in with email and password.
async fn login(
    State(state): State<AuthApiState>,
    meta: ClientMeta,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .auth
        .login(
            &req.email,
            &req.password,
            meta.user_agent.as_deref(),
            meta.ip_address.as_deref(),
        )
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials | AuthError::UserNotFound => {
                ApiError::unauthorized(e.to_string())
            }
            e => auth_internal("Login failed", e),
        })?;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    }))
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
}

/// Exchange a refresh token for a new access token.
async fn refresh(
    State(state): State<AuthApiState>,
    meta: ClientMeta,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let refreshed = state
        .auth
        .refresh(
            &req.refresh_token,
            meta.user_agent.as_deref(),
            meta.ip_address.as_deref(),
        )
        .await
        .map_err(|e| match e {
            AuthError::SessionNotFound | AuthError::InvalidRefreshToken => {
                ApiError::unauthorized(e.to_string())
            }
            e => auth_internal("Token refresh failed", e),
        })?;

    Ok(Json(RefreshResponse {
        access_token: refreshed.access_token,
        expires_in: refreshed.expires_in,
    }))
}

#[derive(Deserialize)]
struct LogoutRequest {
    refresh_token: String,
}

/// Log out: delete the session and blacklist the presented access token.
///
/// Accepts an access token that has already expired - the session should
/// still be deletable - so the bearer token is handled here instead of
/// through the [`Auth`] extractor.
async fn logout(
    State(state): State<AuthApiState>,
    headers: HeaderMap,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = logout_claims(&state, &headers)?;

    state
        .auth
        .logout(&req.refresh_token, Some(&claims.jti), &claims.user_id)
        .await
        .db_err("Failed to log out")?;

    Ok(Json(serde_json::json!({
        "message": "logged out successfully"
    })))
}

/// Recover the access-token claims for logout.
///
/// An expired token is decoded without verification so its jti can still
/// be blacklisted; anything malformed is rejected.
fn logout_claims(state: &AuthApiState, headers: &HeaderMap) -> Result<AccessClaims, ApiError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("invalid authorization header format"))?;

    match state.jwt.verify_access_token(token) {
        Ok(claims) => Ok(claims),
        Err(JwtError::Expired) => state
            .jwt
            .parse_access_token_unverified(token)
            .map_err(|_| ApiError::unauthorized("invalid token")),
        Err(_) => Err(ApiError::unauthorized("invalid token")),
    }
}

/// Log out everywhere: delete every session owned by the caller.
async fn logout_all(
    State(state): State<AuthApiState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .logout_all(&user.user_id)
        .await
        .db_err("Failed to log out all sessions")?;

    Ok(Json(serde_json::json!({
        "message": "all sessions logged out successfully"
    })))
}

#[derive(Serialize)]
struct SessionInfo {
    session_id: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: String,
    last_used_at: String,
    expires_at: String,
}

#[derive(Serialize)]
struct ListSessionsResponse {
    sessions: Vec<SessionInfo>,
}

/// List the caller's active sessions.
async fn list_sessions(
    State(state): State<AuthApiState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .auth
        .list_sessions(&user.user_id)
        .await
        .db_err("Failed to list sessions")?;

    Ok(Json(ListSessionsResponse {
        sessions: sessions
            .into_iter()
            .map(|s| SessionInfo {
                session_id: s.uuid,
                user_agent: s.user_agent,
                ip_address: s.ip_address,
                created_at: s.created_at,
                last_used_at: s.last_used_at,
                expires_at: s.expires_at,
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
struct RevokeRequest {
    jti: String,
    reason: Option<String>,
}

/// Explicitly blacklist a token identifier.
async fn revoke(
    State(state): State<AuthApiState>,
    Auth(user): Auth,
    Json(req): Json<RevokeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.jti.is_empty() {
        return Err(ApiError::bad_request("jti cannot be empty"));
    }

    state
        .auth
        .revoke_token(&req.jti, &user.user_id, req.reason.as_deref())
        .await
        .db_err("Failed to revoke token")?;

    Ok(Json(serde_json::json!({ "revoked": true })))
}

/// Log the detailed failure, hand the caller a generic 500.
fn auth_internal(context: &str, e: AuthError) -> ApiError {
    error!("{}: {}", context, e);
    ApiError::internal("Internal error")
}
