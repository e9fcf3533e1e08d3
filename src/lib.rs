pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;

use api::create_api_router;
use auth::{AuthService, PasswordAuthenticator};
use axum::Router;
use db::Database;
use jwt::JwtConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct ServerConfig {
    /// Database connection (cloneable, uses a connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub jwt_secret: Vec<u8>,
    /// Access-token lifetime
    pub access_ttl: Duration,
    /// Refresh-token / session lifetime
    pub refresh_ttl: Duration,
}

/// Build the auth orchestrator from the configuration.
fn auth_service(config: &ServerConfig) -> (Arc<JwtConfig>, Arc<AuthService>) {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret, config.access_ttl));
    let users = Arc::new(PasswordAuthenticator::new(config.db.users()));
    let auth = Arc::new(AuthService::new(
        config.db.clone(),
        jwt.clone(),
        users,
        config.refresh_ttl,
    ));
    (jwt, auth)
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let (jwt, auth) = auth_service(config);
    create_api_router(config.db.clone(), jwt, auth)
}

/// Spawn the background cleanup scheduler.
///
/// Sweeps once immediately, then hourly, until the shutdown signal
/// flips. The returned handle completes once the reaper has exited.
pub fn init_cleanup(
    config: &ServerConfig,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let (_, auth) = auth_service(config);
    cleanup::spawn_cleanup_scheduler(auth, shutdown)
}
