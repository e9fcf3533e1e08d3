//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::hash_password;
use crate::db::Database;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Bytes of randomness in a generated first-login password.
const GENERATED_PASSWORD_BYTES: usize = 16;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "splitbook", about = "Authentication service for splitbook")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "splitbook.db")]
    pub database: String,

    /// Path to file containing the JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access-token lifetime in seconds
    #[arg(long, env = "ACCESS_TTL_SECS", default_value = "900")]
    pub access_ttl_secs: u64,

    /// Refresh-token lifetime in seconds
    #[arg(long, env = "REFRESH_TTL_SECS", default_value = "2592000")]
    pub refresh_ttl_secs: u64,

    /// Create a user with this email on startup and print a generated password
    #[arg(long, value_name = "EMAIL")]
    pub create_user: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the JWT secret from the environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Handle the --create-user flag: create the account and print its
/// generated password once, or report an existing account.
pub async fn handle_create_user(db: &Database, email: &str) {
    match db.users().find_by_email(email).await {
        Ok(Some(_)) => {
            println!();
            println!("User already exists: {}", email);
            println!();
        }
        Ok(None) => {
            let password = match generate_password() {
                Some(p) => p,
                None => {
                    error!("Failed to generate a password");
                    std::process::exit(1);
                }
            };
            let hash = match hash_password(&password) {
                Ok(h) => h,
                Err(e) => {
                    error!(error = %e, "Failed to hash generated password");
                    std::process::exit(1);
                }
            };

            let uuid = Uuid::new_v4().to_string();
            match db.users().create(&uuid, email, &hash).await {
                Ok(_) => {
                    println!();
                    println!("User created: {}", email);
                    println!("Password: {}", password);
                    println!("Store this password now; it is not shown again.");
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }
}

/// Generate a random URL-safe password from the OS CSPRNG.
fn generate_password() -> Option<String> {
    use base64::Engine;
    use rand::TryRngCore;

    let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
    rand::rngs::OsRng.try_fill_bytes(&mut bytes).ok()?;
    Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl: Duration::from_secs(access_ttl_secs),
        refresh_ttl: Duration::from_secs(refresh_ttl_secs),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
