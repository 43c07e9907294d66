//! Keyward persistence layer.
//!
//! - [`models`] -- row types and creation DTOs for `users` and `user_sessions`.
//! - [`repositories`] -- zero-sized query structs over `&PgPool`.
//! - [`store`] -- the narrow store traits the engine depends on.
//! - [`pg`] / [`memory`] -- PostgreSQL and in-process implementations of those traits.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use store::{AuthStore, CredentialStore, SessionStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
