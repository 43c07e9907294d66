//! PostgreSQL-backed store.

use async_trait::async_trait;
use keyward_core::lockout::SuccessUpdate;
use keyward_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, FailedAttempts, User};
use crate::repositories::{SessionRepo, UserRepo};
use crate::store::{CredentialStore, SessionStore};
use crate::DbPool;

/// Store implementation delegating to [`UserRepo`] and [`SessionRepo`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Flip a record's `is_active` flag. Returns `true` if it changed.
    pub async fn set_active(
        &self,
        id: DbId,
        active: bool,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(UserRepo::set_active(&self.pool, id, active, now).await?)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_identifier(&self.pool, identifier).await?)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_user(&self, input: &CreateUser, now: Timestamp) -> Result<User, StoreError> {
        Ok(UserRepo::create(&self.pool, input, now).await?)
    }

    async fn atomic_increment_failures(
        &self,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<FailedAttempts>, StoreError> {
        Ok(UserRepo::increment_failed_login(&self.pool, id, now).await?)
    }

    async fn lock_until(
        &self,
        id: DbId,
        until: Timestamp,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        Ok(UserRepo::lock_account(&self.pool, id, until, now).await?)
    }

    async fn record_login_success(
        &self,
        id: DbId,
        update: &SuccessUpdate,
    ) -> Result<(), StoreError> {
        Ok(UserRepo::record_successful_login(&self.pool, id, update).await?)
    }

    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        changed_at: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(UserRepo::update_password(&self.pool, id, password_hash, changed_at).await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        Ok(SessionRepo::create(&self.pool, input, now).await?)
    }

    async fn find_session_by_hash(&self, hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_by_refresh_token_hash(&self.pool, hash).await?)
    }

    async fn find_session_by_id(&self, id: DbId) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_active_sessions(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, StoreError> {
        Ok(SessionRepo::list_active_for_user(&self.pool, user_id, now).await?)
    }

    async fn rotate_session(
        &self,
        old_id: DbId,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::rotate(&self.pool, old_id, input, now).await?)
    }

    async fn revoke_session(&self, id: DbId, now: Timestamp) -> Result<bool, StoreError> {
        Ok(SessionRepo::revoke(&self.pool, id, now).await?)
    }

    async fn revoke_all_for_owner(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        Ok(SessionRepo::revoke_all_for_user(&self.pool, user_id, now).await?)
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_expired(&self.pool, now).await?)
    }

    async fn delete_revoked_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_revoked_before(&self.pool, cutoff).await?)
    }
}
