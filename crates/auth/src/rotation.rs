//! Refresh-token rotation with reuse detection.
//!
//! A refresh token is single use. Presenting it retires its session and
//! yields a new pair whose session points back at the old one. Presenting a
//! token whose session is already revoked means the token leaked (or a
//! client replayed it), so every live session of the owner is revoked.
//!
//! Decision order for a presented token:
//!
//! 1. Empty or oversized string: invalid, no store access.
//! 2. No session with that hash: invalid.
//! 3. Session revoked: reuse, cascade revocation.
//! 4. Session past `expires_at`: expired.
//! 5. Owner missing: invalid. Owner inactive: inactive.
//! 6. Session predates the owner's last password change: revoke, invalid.
//! 7. Signature or claims do not match the session: revoke, reject.
//! 8. Conditional revoke plus successor insert in one store transaction.
//!    Losing that race to a concurrent rotation counts as reuse.

use keyward_core::error::AuthError;
use keyward_core::types::Timestamp;
use keyward_db::models::session::Session;
use keyward_db::AuthStore;

use crate::jwt::hash_refresh_token;
use crate::principal::{to_principal_view, AuthSession, ClientInfo};
use crate::{check_token_shape, AuthService};

impl<S: AuthStore + 'static> AuthService<S> {
    /// Exchange a refresh token for a new token pair.
    ///
    /// Reuse is reported to the caller as [`AuthError::TokenInvalid`].
    pub async fn rotate(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<AuthSession, AuthError> {
        self.rotate_inner(refresh_token, client)
            .await
            .map_err(AuthError::into_public)
    }

    /// Revoke the session behind a refresh token.
    ///
    /// Unknown, malformed and already revoked tokens succeed without effect.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if check_token_shape(refresh_token).is_err() {
            return Ok(());
        }

        let store = &self.inner.store;
        let hash = hash_refresh_token(refresh_token);
        if let Some(session) = store.find_session_by_hash(&hash).await? {
            if store.revoke_session(session.id, self.now()).await? {
                tracing::info!(
                    user_id = session.user_id,
                    session_id = session.id,
                    "Session logged out"
                );
            }
        }
        Ok(())
    }

    async fn rotate_inner(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<AuthSession, AuthError> {
        check_token_shape(refresh_token)?;

        let now = self.now();
        let store = &self.inner.store;
        let hash = hash_refresh_token(refresh_token);

        let session = store
            .find_session_by_hash(&hash)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if session.is_revoked {
            return Err(self.handle_reuse(&session, now).await);
        }
        if session.expires_at <= now {
            return Err(AuthError::TokenExpired);
        }

        let user = store
            .find_user_by_id(session.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        if user
            .password_changed_at
            .is_some_and(|changed| session.created_at < changed)
        {
            self.revoke_rejected(&session, now, "Session predates password change")
                .await?;
            return Err(AuthError::TokenInvalid);
        }

        let claims = match self.inner.codec.verify_refresh(refresh_token, now) {
            Ok(claims) => claims,
            Err(e) => {
                self.revoke_rejected(&session, now, "Refresh token failed verification")
                    .await?;
                return Err(e);
            }
        };
        let sid_matches = claims.sid.as_deref() == Some(session.session_id.as_str());
        if claims.sub != session.user_id || !sid_matches {
            self.revoke_rejected(&session, now, "Refresh token claims do not match session")
                .await?;
            return Err(AuthError::TokenInvalid);
        }

        log_client_drift(&session, client);

        let (tokens, input) = self.mint(&user, client, Some(session.id), now)?;
        let Some(successor) = store.rotate_session(session.id, &input, now).await? else {
            return Err(self.handle_reuse(&session, now).await);
        };

        tracing::info!(
            user_id = user.id,
            previous_session_id = session.id,
            session_id = successor.id,
            "Session rotated"
        );

        Ok(AuthSession {
            principal: to_principal_view(&user),
            tokens,
        })
    }

    /// Revoke every session of the owner of a replayed token.
    ///
    /// Always returns an error for the caller to surface: the reuse signal,
    /// or the store failure that prevented the cascade.
    async fn handle_reuse(&self, session: &Session, now: Timestamp) -> AuthError {
        match self
            .inner
            .store
            .revoke_all_for_owner(session.user_id, now)
            .await
        {
            Ok(revoked) => {
                tracing::warn!(
                    user_id = session.user_id,
                    session_id = session.id,
                    revoked,
                    "Refresh token reuse detected; all sessions revoked"
                );
                AuthError::SessionReuseDetected
            }
            Err(e) => e.into(),
        }
    }

    async fn revoke_rejected(
        &self,
        session: &Session,
        now: Timestamp,
        reason: &'static str,
    ) -> Result<(), AuthError> {
        self.inner.store.revoke_session(session.id, now).await?;
        tracing::warn!(
            user_id = session.user_id,
            session_id = session.id,
            reason,
            "Refresh rejected; session revoked"
        );
        Ok(())
    }
}

/// Client metadata changes are logged, never enforced.
fn log_client_drift(session: &Session, client: &ClientInfo) {
    let ip_changed = differs(&session.ip_address, &client.ip_address);
    let agent_changed = differs(&session.user_agent, &client.user_agent);
    if ip_changed || agent_changed {
        tracing::warn!(
            user_id = session.user_id,
            session_id = session.id,
            ip_changed,
            agent_changed,
            "Refresh presented from different client"
        );
    }
}

fn differs(recorded: &Option<String>, presented: &Option<String>) -> bool {
    matches!((recorded, presented), (Some(a), Some(b)) if a != b)
}
