//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::JwtError;

/// Errors from the auth flows (login, refresh, logout, revoke, cleanup).
///
/// A missing session and a revoked session are deliberately the same
/// error: a refresh secret that was logged out is indistinguishable from
/// one that never existed.
#[derive(Debug)]
pub enum AuthError {
    /// Password mismatch
    InvalidCredentials,
    /// No account for the given email
    UserNotFound,
    /// Refresh secret does not resolve to a live session
    SessionNotFound,
    /// Refresh secret is malformed
    InvalidRefreshToken,
    /// Token codec failure
    Token(JwtError),
    /// Record store failure
    Storage(sqlx::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid email or password"),
            AuthError::UserNotFound => write!(f, "user not found"),
            AuthError::SessionNotFound => write!(f, "session not found"),
            AuthError::InvalidRefreshToken => write!(f, "invalid refresh token"),
            AuthError::Token(e) => write!(f, "token error: {}", e),
            AuthError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::Token(e)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Storage(e)
    }
}

/// Rejection from the request authenticator (required mode).
///
/// Each variant maps to a distinct user-facing message so clients can
/// tell an expired token from a malformed one from a revoked one.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    MissingAuth,
    MalformedAuth,
    ExpiredToken,
    InvalidToken,
    TokenRevoked,
    /// The blacklist could not be consulted; fail closed.
    Internal,
}

impl AuthRejection {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthRejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthRejection::MissingAuth => "missing authorization header",
            AuthRejection::MalformedAuth => "invalid authorization header format",
            AuthRejection::ExpiredToken => "token has expired",
            AuthRejection::InvalidToken => "invalid token",
            AuthRejection::TokenRevoked => "token has been revoked",
            AuthRejection::Internal => "authentication error",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
