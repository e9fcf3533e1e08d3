#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use splitbook::auth::hash_password;
use splitbook::db::Database;
use splitbook::jwt::JwtConfig;
use splitbook::{ServerConfig, create_app};
use std::time::Duration;
use tower::util::ServiceExt;

/// Signing secret shared by the test app and token helpers.
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

pub const TEST_ACCESS_TTL: Duration = Duration::from_secs(900);

/// Build the real application router on an in-memory database.
pub async fn build_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        access_ttl: TEST_ACCESS_TTL,
        refresh_ttl: Duration::from_secs(3600),
    };

    (create_app(&config), db)
}

/// A token codec configured like the test app, for inspecting and
/// crafting tokens in tests.
pub fn test_jwt() -> JwtConfig {
    JwtConfig::new(TEST_JWT_SECRET, TEST_ACCESS_TTL)
}

/// Create a user directly in the database. Returns the user's UUID.
pub async fn create_test_user(db: &Database, email: &str, password: &str) -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    let hash = hash_password(password).expect("hashing should succeed");
    db.users()
        .create(&uuid, email, &hash)
        .await
        .expect("user creation should succeed");
    uuid
}

/// POST a JSON body, optionally with a bearer token.
pub async fn post_json(
    app: &Router,
    path: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// GET a path, optionally with a bearer token.
pub async fn get(app: &Router, path: &str, bearer: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log a user in via the API and return the response JSON.
pub async fn login(app: &Router, email: &str, password: &str) -> serde_json::Value {
    let response = post_json(
        app,
        "/auth/login",
        None,
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await
}
