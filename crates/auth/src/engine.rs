//! Credential verification, registration and password changes.

use keyward_core::error::AuthError;
use keyward_core::identifier::{validate_credentials_input, validate_password_strength};
use keyward_core::lockout::LockoutDecision;
use keyward_core::types::{DbId, Timestamp};
use keyward_db::models::user::{CreateUser, User};
use keyward_db::{AuthStore, StoreError};

use crate::jwt::Claims;
use crate::principal::{
    to_principal_view, AuthSession, ClientInfo, PrincipalView, RegistrationProfile,
};
use crate::{check_token_shape, AuthService};

const IDENTIFIER_TAKEN: &str = "Identifier is already registered";

impl<S: AuthStore + 'static> AuthService<S> {
    /// Verify an identifier/password pair and return the sanitized principal.
    ///
    /// Unknown identifiers and wrong passwords are indistinguishable
    /// ([`AuthError::InvalidCredentials`]). A lock in force rejects before the
    /// password is compared. An inactive account is only reported once the
    /// password has been verified.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<PrincipalView, AuthError> {
        let now = self.now();
        let user = self.verify_credentials(identifier, password, now).await?;
        Ok(to_principal_view(&user))
    }

    /// [`Self::authenticate`], then issue a token pair backed by a new session.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AuthSession, AuthError> {
        let now = self.now();
        let user = self.verify_credentials(identifier, password, now).await?;
        let session = self.issue_session(&user, client, now).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Create a credential record with the default role and sign it in.
    pub async fn register(
        &self,
        identifier: &str,
        password: &str,
        profile: RegistrationProfile,
        client: &ClientInfo,
    ) -> Result<AuthSession, AuthError> {
        let identifier = validate_credentials_input(identifier, password)?;
        validate_password_strength(password, self.inner.config.password.min_length)?;

        let store = &self.inner.store;
        if store.find_by_identifier(&identifier).await?.is_some() {
            return Err(AuthError::Conflict(IDENTIFIER_TAKEN.into()));
        }

        let password_hash = self.inner.hasher.hash(password).await?;
        let input = CreateUser {
            identifier,
            display_name: profile
                .display_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            password_hash,
            roles: vec![self.inner.config.default_role.clone()],
        };

        let now = self.now();
        // A concurrent registration can still win between the check and the insert.
        let user = store.create_user(&input, now).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::Conflict(IDENTIFIER_TAKEN.into()),
            other => other.into(),
        })?;

        tracing::info!(user_id = user.id, "User registered");
        self.issue_session(&user, client, now).await
    }

    /// Replace the password after checking the current one, then revoke every
    /// session of the owner. Returns the number of sessions revoked.
    ///
    /// The current-password check is subject to the same lockout rule as
    /// [`Self::authenticate`]: a lock in force rejects it, and a wrong
    /// password counts as a failed attempt.
    pub async fn change_password(
        &self,
        user_id: DbId,
        current_password: &str,
        new_password: &str,
    ) -> Result<u64, AuthError> {
        let user = self
            .inner
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let now = self.now();
        let policy = &self.inner.config.lockout;
        if let LockoutDecision::Locked { until } = policy.check(user.locked_until, now) {
            tracing::warn!(user_id, %until, "Password change attempt on locked account");
            return Err(AuthError::AccountLocked { until });
        }

        if !self
            .inner
            .hasher
            .verify(current_password, &user.password_hash)
            .await?
        {
            self.record_failure(&user, now).await?;
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::info!(user_id, "Password change attempt on inactive account");
            return Err(AuthError::AccountInactive);
        }

        self.set_password(user_id, new_password).await
    }

    /// Replace the password without the current-password check (reset flow
    /// or administrative action), then revoke every session of the owner.
    pub async fn reset_password(
        &self,
        user_id: DbId,
        new_password: &str,
    ) -> Result<u64, AuthError> {
        self.set_password(user_id, new_password).await
    }

    /// Validate a stateless access token against the service clock.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        check_token_shape(token)?;
        self.inner.codec.verify_access(token, self.now())
    }

    async fn set_password(&self, user_id: DbId, new_password: &str) -> Result<u64, AuthError> {
        validate_password_strength(new_password, self.inner.config.password.min_length)?;

        let password_hash = self.inner.hasher.hash(new_password).await?;
        let now = self.now();
        let store = &self.inner.store;
        if !store.update_password(user_id, &password_hash, now).await? {
            return Err(AuthError::NotFound);
        }

        let revoked = store.revoke_all_for_owner(user_id, now).await?;
        tracing::info!(user_id, revoked, "Password changed; sessions revoked");
        Ok(revoked)
    }

    async fn verify_credentials(
        &self,
        identifier: &str,
        password: &str,
        now: Timestamp,
    ) -> Result<User, AuthError> {
        let identifier = validate_credentials_input(identifier, password)?;
        let store = &self.inner.store;
        let hasher = &self.inner.hasher;
        let policy = &self.inner.config.lockout;

        let Some(mut user) = store.find_by_identifier(&identifier).await? else {
            // Spend the same hashing work as a real comparison.
            hasher.verify(password, &self.inner.dummy_hash).await?;
            tracing::debug!("Login attempt for unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if let LockoutDecision::Locked { until } = policy.check(user.locked_until, now) {
            tracing::warn!(user_id = user.id, %until, "Login attempt on locked account");
            return Err(AuthError::AccountLocked { until });
        }

        if !hasher.verify(password, &user.password_hash).await? {
            self.record_failure(&user, now).await?;
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::info!(user_id = user.id, "Login attempt on inactive account");
            return Err(AuthError::AccountInactive);
        }

        let update = policy.on_success(now);
        store.record_login_success(user.id, &update).await?;
        user.failed_login_count = update.failed_attempts;
        user.locked_until = update.locked_until;
        user.last_login_at = Some(update.last_login_at);
        Ok(user)
    }

    async fn record_failure(&self, user: &User, now: Timestamp) -> Result<(), AuthError> {
        let store = &self.inner.store;
        let Some(attempts) = store.atomic_increment_failures(user.id, now).await? else {
            return Ok(());
        };

        let update = self.inner.config.lockout.on_failure(
            attempts.failed_login_count,
            attempts.locked_until,
            now,
        );
        match update.lock_until {
            Some(until) => {
                store.lock_until(user.id, until, now).await?;
                tracing::warn!(
                    user_id = user.id,
                    failed_attempts = update.failed_attempts,
                    %until,
                    "Account locked after repeated failed password checks"
                );
            }
            None => {
                tracing::debug!(
                    user_id = user.id,
                    failed_attempts = update.failed_attempts,
                    "Failed password check"
                );
            }
        }
        Ok(())
    }
}
