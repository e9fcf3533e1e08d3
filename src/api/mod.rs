mod auth;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::Database;
use crate::jwt::JwtConfig;

pub use auth::AuthApiState;

/// Create the API router.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, auth: Arc<AuthService>) -> Router {
    let auth_state = AuthApiState { db, jwt, auth };

    Router::new().nest("/auth", auth::router(auth_state))
}
