//! Credential record model and DTOs.

use keyward_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full credential row from the `users` table.
///
/// Contains the password hash -- NEVER hand this to callers directly.
/// The engine converts it into a sanitized principal view at every read.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    /// Normalized (trimmed, lower-cased) login address.
    pub identifier: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    /// Opaque role labels.
    pub roles: Vec<String>,
    pub is_active: bool,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub password_changed_at: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new credential record.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub identifier: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// Counter state returned by the atomic failed-attempt increment.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct FailedAttempts {
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
}
