//! Store traits consumed by the authentication engine.
//!
//! The engine never sees a connection pool; it talks to these two narrow
//! interfaces so it can run against PostgreSQL ([`crate::PgStore`]) or an
//! in-process fake ([`crate::MemoryStore`]).

use async_trait::async_trait;
use keyward_core::lockout::SuccessUpdate;
use keyward_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, FailedAttempts, User};

/// Persistence of credential records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a record by its normalized identifier.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Insert a record. A taken identifier yields [`StoreError::Conflict`].
    async fn create_user(&self, input: &CreateUser, now: Timestamp) -> Result<User, StoreError>;

    /// Add one to the failure counter as a single read-modify-write.
    ///
    /// Returns `None` if the record does not exist.
    async fn atomic_increment_failures(
        &self,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<FailedAttempts>, StoreError>;

    /// Lock until `until`, keeping any later lock already in place.
    async fn lock_until(&self, id: DbId, until: Timestamp, now: Timestamp)
        -> Result<(), StoreError>;

    /// Apply the lockout reset after a successful login.
    async fn record_login_success(&self, id: DbId, update: &SuccessUpdate)
        -> Result<(), StoreError>;

    /// Store a new password hash and stamp `password_changed_at`.
    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        changed_at: Timestamp,
    ) -> Result<bool, StoreError>;
}

/// Persistence of refresh-token sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Session, StoreError>;

    /// Look up a session by refresh token hash, including revoked and expired rows.
    async fn find_session_by_hash(&self, hash: &str) -> Result<Option<Session>, StoreError>;

    async fn find_session_by_id(&self, id: DbId) -> Result<Option<Session>, StoreError>;

    /// Live (non-revoked, unexpired) sessions of one owner.
    async fn list_active_sessions(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, StoreError>;

    /// Atomically revoke the live session `old_id` and create its successor.
    ///
    /// Returns `None`, having written nothing, when `old_id` was no longer live.
    async fn rotate_session(
        &self,
        old_id: DbId,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// Revoke one session. Returns `true` if it was live before the call.
    async fn revoke_session(&self, id: DbId, now: Timestamp) -> Result<bool, StoreError>;

    /// Revoke every non-revoked session of an owner, returning how many changed.
    async fn revoke_all_for_owner(&self, user_id: DbId, now: Timestamp)
        -> Result<u64, StoreError>;

    /// Hard-delete sessions whose `expires_at` has passed.
    async fn delete_expired(&self, now: Timestamp) -> Result<u64, StoreError>;

    /// Hard-delete revoked sessions whose `updated_at` is older than `cutoff`.
    async fn delete_revoked_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;
}

/// Everything the engine needs from persistence.
pub trait AuthStore: CredentialStore + SessionStore {}

impl<T> AuthStore for T where T: CredentialStore + SessionStore {}
