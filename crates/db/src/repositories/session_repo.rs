//! Repository for the `user_sessions` table.

use keyward_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, session_id, refresh_token_hash, ip_address, user_agent, \
                        expires_at, is_revoked, previous_session_id, created_at, updated_at, \
                        last_used_at";

/// Insert statement shared by [`SessionRepo::create`] and [`SessionRepo::rotate`].
fn insert_query() -> String {
    format!(
        "INSERT INTO user_sessions
            (user_id, session_id, refresh_token_hash, ip_address, user_agent,
             expires_at, previous_session_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING {COLUMNS}"
    )
}

/// Provides session queries.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Session, sqlx::Error> {
        sqlx::query_as::<_, Session>(&insert_query())
            .bind(input.user_id)
            .bind(&input.session_id)
            .bind(&input.refresh_token_hash)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .bind(input.expires_at)
            .bind(input.previous_session_id)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Find a session by its refresh token hash, whatever its state.
    ///
    /// Revoked and expired rows are returned too: the rotation protocol needs
    /// them to tell reuse and expiry apart from unknown tokens.
    pub async fn find_by_refresh_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE refresh_token_hash = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by its record ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's live sessions, most recent first.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE user_id = $1 AND is_revoked = false AND expires_at > $2
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Revoke `old_id` and insert its successor in one transaction.
    ///
    /// The revoke only applies to a live row. When it matches nothing (the
    /// session was revoked or expired concurrently) the transaction is
    /// rolled back and `None` is returned; no successor is created.
    pub async fn rotate(
        pool: &PgPool,
        old_id: DbId,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE user_sessions
             SET is_revoked = true, last_used_at = $2, updated_at = $2
             WHERE id = $1 AND is_revoked = false AND expires_at > $2",
        )
        .bind(old_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let created = sqlx::query_as::<_, Session>(&insert_query())
            .bind(input.user_id)
            .bind(&input.session_id)
            .bind(&input.refresh_token_hash)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .bind(input.expires_at)
            .bind(old_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(created))
    }

    /// Revoke a single session. Returns `true` if the row was updated.
    pub async fn revoke(pool: &PgPool, id: DbId, now: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true, updated_at = $2
             WHERE id = $1 AND is_revoked = false",
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke all active sessions for a user. Returns the count of revoked sessions.
    pub async fn revoke_all_for_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true, updated_at = $2
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions past their absolute expiry. Returns the count of deleted rows.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete revoked sessions last touched before `cutoff`. Returns the count of deleted rows.
    pub async fn delete_revoked_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM user_sessions WHERE is_revoked = true AND updated_at < $1")
                .bind(cutoff)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
