//! Session revocation and store hygiene.

use keyward_core::error::AuthError;
use keyward_core::types::DbId;
use keyward_db::AuthStore;

use crate::principal::{to_session_view, SessionView};
use crate::AuthService;

impl<S: AuthStore + 'static> AuthService<S> {
    /// Revoke one of the owner's sessions by record id.
    ///
    /// A session that does not exist and one owned by someone else both yield
    /// [`AuthError::NotFound`]. Revoking an already revoked session succeeds.
    pub async fn revoke_session(&self, owner_id: DbId, session_id: DbId) -> Result<(), AuthError> {
        let store = &self.inner.store;
        let session = store
            .find_session_by_id(session_id)
            .await?
            .filter(|s| s.user_id == owner_id)
            .ok_or(AuthError::NotFound)?;

        if store.revoke_session(session.id, self.now()).await? {
            tracing::info!(user_id = owner_id, session_id, "Session revoked");
        }
        Ok(())
    }

    /// Revoke every live session of the owner ("log out everywhere").
    pub async fn revoke_all(&self, owner_id: DbId) -> Result<u64, AuthError> {
        let revoked = self
            .inner
            .store
            .revoke_all_for_owner(owner_id, self.now())
            .await?;
        tracing::info!(user_id = owner_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    /// Live sessions of the owner, newest first.
    pub async fn list_sessions(&self, owner_id: DbId) -> Result<Vec<SessionView>, AuthError> {
        let sessions = self
            .inner
            .store
            .list_active_sessions(owner_id, self.now())
            .await?;
        Ok(sessions.iter().map(to_session_view).collect())
    }

    /// Delete sessions past their absolute expiry.
    pub async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        Ok(self.inner.store.delete_expired(self.now()).await?)
    }

    /// Delete revoked sessions not touched within `retention_days`.
    pub async fn cleanup_old_revoked(&self, retention_days: i64) -> Result<u64, AuthError> {
        if retention_days < 0 {
            return Err(AuthError::Validation(
                "Retention period must not be negative".into(),
            ));
        }
        let cutoff = chrono::Duration::try_days(retention_days)
            .and_then(|window| self.now().checked_sub_signed(window))
            .ok_or_else(|| AuthError::Validation("Retention period is too large".into()))?;
        Ok(self.inner.store.delete_revoked_before(cutoff).await?)
    }
}
