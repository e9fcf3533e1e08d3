//! Background reaper for expired sessions and blacklist entries.

use crate::auth::AuthService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Interval between cleanup sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run one cleanup sweep.
///
/// Failures are logged and left for the next tick; the reaper never
/// takes the process down over a transient store error.
pub async fn run_cleanup(auth: &AuthService) {
    match auth.cleanup_expired().await {
        Ok(report) if report.sessions > 0 || report.blacklist > 0 => {
            info!(
                sessions = report.sessions,
                blacklist = report.blacklist,
                "Cleaned up expired auth records"
            );
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Auth cleanup failed, retrying next tick"),
    }
}

/// Spawn the reaper task: one immediate sweep, then one per interval.
///
/// The task exits between sweeps when the shutdown signal flips; a sweep
/// in progress finishes its current statement first.
pub fn spawn_cleanup_scheduler(
    auth: Arc<AuthService>,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            tokio::select! {
                _ = interval.tick() => run_cleanup(&auth).await,
                _ = shutdown.changed() => break,
            }
        }
    })
}
