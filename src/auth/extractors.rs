//! Axum extractors for bearer-token authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::AuthRejection;
use super::state::HasAuthState;
use super::types::AuthUser;
use crate::jwt::JwtError;

/// Core authentication pipeline shared by the required and optional
/// extractors: extract the bearer token, verify it, consult the
/// blacklist, and build the identity.
///
/// A blacklist lookup failure rejects the request: an authenticator that
/// cannot confirm non-revocation must not authenticate.
async fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthUser, AuthRejection>
where
    S: HasAuthState + Send + Sync,
{
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthRejection::MissingAuth)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(AuthRejection::MalformedAuth)?;

    let claims = state.jwt().verify_access_token(token).map_err(|e| match e {
        JwtError::Expired => AuthRejection::ExpiredToken,
        _ => AuthRejection::InvalidToken,
    })?;

    let blacklisted = state
        .db()
        .blacklist()
        .is_blacklisted(&claims.jti)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check token blacklist");
            AuthRejection::Internal
        })?;

    if blacklisted {
        return Err(AuthRejection::TokenRevoked);
    }

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.email,
        jti: claims.jti,
    })
}

/// Extractor for endpoints that require authentication.
///
/// Fails closed: any missing, malformed, invalid, expired, or revoked
/// token rejects the request with a distinct 401 reason. On success the
/// identity is also inserted into the request extensions for downstream
/// middleware.
pub struct Auth(pub AuthUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_request(parts, state).await?;
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Optional authentication extractor - never fails.
///
/// Runs the same checks as [`Auth`] but degrades every failure to an
/// unauthenticated request. For endpoints whose behavior varies by
/// identity without requiring it.
pub struct OptionalAuth(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match authenticate_request(parts, state).await {
            Ok(user) => {
                parts.extensions.insert(user.clone());
                Ok(OptionalAuth(Some(user)))
            }
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::impl_has_auth_state;
    use crate::jwt::JwtConfig;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    #[derive(Clone)]
    struct TestState {
        db: Database,
        jwt: Arc<JwtConfig>,
    }

    impl_has_auth_state!(TestState);

    async fn test_router() -> (Router, TestState) {
        let state = TestState {
            db: Database::open(":memory:").await.unwrap(),
            jwt: Arc::new(JwtConfig::new(
                b"test-secret-key-for-testing-only",
                Duration::from_secs(900),
            )),
        };

        async fn protected(Auth(user): Auth) -> String {
            user.user_id
        }

        async fn maybe(OptionalAuth(user): OptionalAuth) -> String {
            match user {
                Some(u) => u.user_id,
                None => "anonymous".to_string(),
            }
        }

        let router = Router::new()
            .route("/protected", get(protected))
            .route("/maybe", get(maybe))
            .with_state(state.clone());
        (router, state)
    }

    async fn send(router: &Router, path: &str, auth_header: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = auth_header {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn test_required_mode_accepts_valid_token() {
        let (router, state) = test_router().await;
        let issued = state.jwt.issue_access_token("user-1", "a@b.c").unwrap();

        let (status, body) = send(
            &router,
            "/protected",
            Some(&format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-1");
    }

    #[tokio::test]
    async fn test_required_mode_rejections_are_distinct() {
        let (router, state) = test_router().await;

        let (status, body) = send(&router, "/protected", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing authorization header"));

        let (status, body) = send(&router, "/protected", Some("Basic abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid authorization header format"));

        let (status, body) = send(&router, "/protected", Some("Bearer ")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid authorization header format"));

        let (status, body) = send(&router, "/protected", Some("Bearer garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid token"));

        // A revoked token gets its own reason.
        let issued = state.jwt.issue_access_token("user-1", "a@b.c").unwrap();
        let exp = crate::jwt::unix_now().unwrap() + 900;
        state
            .db
            .blacklist()
            .insert(&issued.jti, "user-1", exp, None)
            .await
            .unwrap();
        let (status, body) = send(
            &router,
            "/protected",
            Some(&format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("token has been revoked"));
    }

    #[tokio::test]
    async fn test_optional_mode_never_rejects() {
        let (router, state) = test_router().await;

        for auth in [
            None,
            Some("Basic abc"),
            Some("Bearer "),
            Some("Bearer garbage"),
        ] {
            let (status, body) = send(&router, "/maybe", auth).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "anonymous");
        }

        // With a valid token the identity comes through.
        let issued = state.jwt.issue_access_token("user-1", "a@b.c").unwrap();
        let (status, body) =
            send(&router, "/maybe", Some(&format!("Bearer {}", issued.token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-1");
    }
}
