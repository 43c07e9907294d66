//! In-process store.
//!
//! Every operation runs under one [`tokio::sync::Mutex`], so each trait call
//! is atomic with respect to every other, matching the statement and
//! transaction guarantees of [`crate::PgStore`]. Used by tests and by
//! embedders that do not need durability.

use std::collections::BTreeMap;

use async_trait::async_trait;
use keyward_core::lockout::SuccessUpdate;
use keyward_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, FailedAttempts, User};
use crate::store::{CredentialStore, SessionStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<DbId, User>,
    sessions: BTreeMap<DbId, Session>,
    next_user_id: DbId,
    next_session_id: DbId,
}

impl Tables {
    fn insert_session(
        &mut self,
        input: &CreateSession,
        previous_session_id: Option<DbId>,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        if self.sessions.values().any(|s| {
            s.refresh_token_hash == input.refresh_token_hash || s.session_id == input.session_id
        }) {
            return Err(StoreError::Conflict(
                "Duplicate value violates unique constraint: uq_user_sessions_refresh_token_hash"
                    .into(),
            ));
        }

        self.next_session_id += 1;
        let session = Session {
            id: self.next_session_id,
            user_id: input.user_id,
            session_id: input.session_id.clone(),
            refresh_token_hash: input.refresh_token_hash.clone(),
            ip_address: input.ip_address.clone(),
            user_agent: input.user_agent.clone(),
            expires_at: input.expires_at,
            is_revoked: false,
            previous_session_id,
            created_at: now,
            updated_at: now,
            last_used_at: None,
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Remove matching sessions, clearing successor links that pointed at
    /// them (`ON DELETE SET NULL`).
    fn delete_sessions_where(&mut self, doomed: impl Fn(&Session) -> bool) -> u64 {
        let removed: Vec<DbId> = self
            .sessions
            .values()
            .filter(|s| doomed(s))
            .map(|s| s.id)
            .collect();
        for id in &removed {
            self.sessions.remove(id);
        }
        for session in self.sessions.values_mut() {
            if session
                .previous_session_id
                .is_some_and(|prev| removed.contains(&prev))
            {
                session.previous_session_id = None;
            }
        }
        removed.len() as u64
    }
}

/// Mutex-guarded, non-durable store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a record's `is_active` flag, as the user-management side would.
    pub async fn set_active(&self, id: DbId, active: bool) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Every session of an owner, revoked or not, oldest first.
    pub async fn all_sessions_for(&self, user_id: DbId) -> Vec<Session> {
        let tables = self.tables.lock().await;
        tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.identifier == identifier)
            .cloned())
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn create_user(&self, input: &CreateUser, now: Timestamp) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .values()
            .any(|u| u.identifier == input.identifier)
        {
            return Err(StoreError::Conflict(
                "Duplicate value violates unique constraint: uq_users_identifier".into(),
            ));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            identifier: input.identifier.clone(),
            display_name: input.display_name.clone(),
            password_hash: input.password_hash.clone(),
            roles: input.roles.clone(),
            is_active: true,
            failed_login_count: 0,
            locked_until: None,
            password_changed_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn atomic_increment_failures(
        &self,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<FailedAttempts>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.failed_login_count += 1;
            user.updated_at = now;
            FailedAttempts {
                failed_login_count: user.failed_login_count,
                locked_until: user.locked_until,
            }
        }))
    }

    async fn lock_until(
        &self,
        id: DbId,
        until: Timestamp,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.locked_until = Some(match user.locked_until {
                Some(existing) if existing > until => existing,
                _ => until,
            });
            user.updated_at = now;
        }
        Ok(())
    }

    async fn record_login_success(
        &self,
        id: DbId,
        update: &SuccessUpdate,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.failed_login_count = update.failed_attempts;
            user.locked_until = update.locked_until;
            user.last_login_at = Some(update.last_login_at);
            user.updated_at = update.last_login_at;
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        changed_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.password_changed_at = Some(changed_at);
                user.failed_login_count = 0;
                user.locked_until = None;
                user.updated_at = changed_at;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.insert_session(input, input.previous_session_id, now)
    }

    async fn find_session_by_hash(&self, hash: &str) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.refresh_token_hash == hash)
            .cloned())
    }

    async fn find_session_by_id(&self, id: DbId) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.lock().await.sessions.get(&id).cloned())
    }

    async fn list_active_sessions(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, StoreError> {
        let tables = self.tables.lock().await;
        let mut live: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_live(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(live)
    }

    async fn rotate_session(
        &self,
        old_id: DbId,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let mut tables = self.tables.lock().await;

        match tables.sessions.get(&old_id) {
            Some(old) if old.is_live(now) => {}
            _ => return Ok(None),
        }

        // Insert first so a conflict leaves the predecessor untouched.
        let created = tables.insert_session(input, Some(old_id), now)?;
        if let Some(old) = tables.sessions.get_mut(&old_id) {
            old.is_revoked = true;
            old.last_used_at = Some(now);
            old.updated_at = now;
        }
        Ok(Some(created))
    }

    async fn revoke_session(&self, id: DbId, now: Timestamp) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.sessions.get_mut(&id) {
            Some(session) if !session.is_revoked => {
                session.is_revoked = true;
                session.updated_at = now;
                true
            }
            _ => false,
        })
    }

    async fn revoke_all_for_owner(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut revoked = 0;
        for session in tables
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && !s.is_revoked)
        {
            session.is_revoked = true;
            session.updated_at = now;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.delete_sessions_where(|s| s.expires_at <= now))
    }

    async fn delete_revoked_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.delete_sessions_where(|s| s.is_revoked && s.updated_at < cutoff))
    }
}
