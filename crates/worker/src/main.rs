//! Session maintenance worker.
//!
//! Connects to the database, applies migrations, and runs the scheduled
//! session cleanup until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use keyward_auth::background::session_cleanup::{self, DEFAULT_CLEANUP_INTERVAL};
use keyward_auth::{AuthConfig, AuthService};
use keyward_db::PgStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyward_worker=debug,keyward_auth=info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = AuthConfig::from_env().context("Invalid auth configuration")?;
    let interval = cleanup_interval()?;
    let retention_days = config.revoked_retention_days;
    tracing::info!(
        retention_days,
        interval_secs = interval.as_secs(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = keyward_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    keyward_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    keyward_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Service ---
    let service = AuthService::new(Arc::new(PgStore::new(pool)), config)
        .context("Failed to build auth service")?;

    let cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(session_cleanup::run(
        service,
        interval,
        retention_days,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    cleanup_handle.await.context("Cleanup task panicked")?;
    tracing::info!("Worker stopped");
    Ok(())
}

/// `SESSION_CLEANUP_INTERVAL_SECS`, defaulting to one hour.
fn cleanup_interval() -> anyhow::Result<Duration> {
    match std::env::var("SESSION_CLEANUP_INTERVAL_SECS") {
        Ok(raw) => {
            let secs: u64 = raw.trim().parse().with_context(|| {
                format!("SESSION_CLEANUP_INTERVAL_SECS is not a number: {raw:?}")
            })?;
            anyhow::ensure!(secs > 0, "SESSION_CLEANUP_INTERVAL_SECS must be positive");
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(DEFAULT_CLEANUP_INTERVAL),
    }
}
