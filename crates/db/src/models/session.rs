//! User session model and DTOs.

use keyward_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A user session row from the `user_sessions` table.
///
/// One row per issued refresh token. Rotation revokes the row and inserts a
/// successor pointing back at it through `previous_session_id`.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    /// Random value embedded as the `sid` claim of the refresh token.
    pub session_id: String,
    /// SHA-256 hex digest of the full refresh token.
    pub refresh_token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub previous_session_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

impl Session {
    /// Not revoked and not past its absolute expiry.
    pub fn is_live(&self, now: Timestamp) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

/// DTO for creating a new session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub session_id: String,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub previous_session_id: Option<DbId>,
}
