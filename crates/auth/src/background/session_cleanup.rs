//! Periodic cleanup of dead sessions.
//!
//! Each tick hard-deletes sessions past their absolute expiry and revoked
//! sessions older than the retention window. Failures are logged and the
//! loop keeps running.

use std::time::Duration;

use keyward_db::AuthStore;
use tokio_util::sync::CancellationToken;

use crate::AuthService;

/// Default interval between cleanup passes: 1 hour.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the session cleanup loop until `cancel` is triggered.
///
/// The first pass runs immediately.
pub async fn run<S: AuthStore + 'static>(
    service: AuthService<S>,
    interval: Duration,
    retention_days: i64,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_days,
        interval_secs = interval.as_secs(),
        "Session cleanup job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = ticker.tick() => {
                run_once(&service, retention_days).await;
            }
        }
    }
}

async fn run_once<S: AuthStore + 'static>(service: &AuthService<S>, retention_days: i64) {
    match service.cleanup_expired().await {
        Ok(0) => tracing::debug!("Session cleanup: no expired sessions"),
        Ok(deleted) => tracing::info!(deleted, "Session cleanup: purged expired sessions"),
        Err(e) => tracing::error!(error = %e, "Session cleanup: expired purge failed"),
    }

    match service.cleanup_old_revoked(retention_days).await {
        Ok(0) => tracing::debug!("Session cleanup: no old revoked sessions"),
        Ok(deleted) => tracing::info!(deleted, "Session cleanup: purged old revoked sessions"),
        Err(e) => tracing::error!(error = %e, "Session cleanup: revoked purge failed"),
    }
}
