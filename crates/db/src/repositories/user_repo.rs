//! Repository for the `users` table.

use keyward_core::lockout::SuccessUpdate;
use keyward_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{CreateUser, FailedAttempts, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, identifier, display_name, password_hash, roles, is_active, \
                        failed_login_count, locked_until, password_changed_at, \
                        last_login_at, created_at, updated_at";

/// Provides credential-record queries.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// A duplicate identifier fails on `uq_users_identifier`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUser,
        now: Timestamp,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (identifier, display_name, password_hash, roles, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.identifier)
            .bind(&input.display_name)
            .bind(&input.password_hash)
            .bind(&input.roles)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by normalized identifier.
    pub async fn find_by_identifier(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE identifier = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(identifier)
            .fetch_optional(pool)
            .await
    }

    /// Set `is_active`. Returns `true` if the row changed.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        active: bool,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = $2, updated_at = $3
             WHERE id = $1 AND is_active <> $2",
        )
        .bind(id)
        .bind(active)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Increment the failed login counter by 1 in a single statement and
    /// return the counter state after the increment.
    pub async fn increment_failed_login(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<FailedAttempts>, sqlx::Error> {
        sqlx::query_as::<_, FailedAttempts>(
            "UPDATE users SET failed_login_count = failed_login_count + 1, updated_at = $2
             WHERE id = $1
             RETURNING failed_login_count, locked_until",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    /// Lock a user account until the specified timestamp.
    ///
    /// Keeps the later of the existing and requested lock.
    pub async fn lock_account(
        pool: &PgPool,
        id: DbId,
        until: Timestamp,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                locked_until = GREATEST(COALESCE(locked_until, $2), $2),
                updated_at = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(until)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a successful login: reset `failed_login_count`, clear
    /// `locked_until`, and set `last_login_at`, all in one update.
    pub async fn record_successful_login(
        pool: &PgPool,
        id: DbId,
        update: &SuccessUpdate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = $2,
                locked_until = $3,
                last_login_at = $4,
                updated_at = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.failed_attempts)
        .bind(update.locked_until)
        .bind(update.last_login_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace a user's password hash and stamp `password_changed_at`.
    /// Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
        changed_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = $2,
                password_changed_at = $3,
                failed_login_count = 0,
                locked_until = NULL,
                updated_at = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(changed_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
