use std::net::SocketAddr;

use clap::Parser;
use splitbook::cli::{Args, build_config, handle_create_user, init_logging, load_jwt_secret, open_database};
use splitbook::{create_app, init_cleanup};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_user.as_deref() {
        handle_create_user(&db, email).await;
    }

    let config = build_config(db, jwt_secret, args.access_ttl_secs, args.refresh_ttl_secs);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = init_cleanup(&config, shutdown_rx);

    let app = create_app(&config);

    let local_addr = listener.local_addr().expect("listener has a local address");
    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    // Stop the reaper between ticks and wait for it to exit.
    let _ = shutdown_tx.send(true);
    let _ = reaper.await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
