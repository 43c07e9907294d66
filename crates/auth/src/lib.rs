//! Keyward authentication engine.
//!
//! [`AuthService`] bundles the store, token codec, password hasher, lockout
//! policy and clock. Its operations are split by concern:
//!
//! - [`engine`] -- authenticate, login, register, credential changes.
//! - [`rotation`] -- refresh-token rotation with reuse detection, logout.
//! - [`revocation`] -- per-session and per-owner revocation, cleanup.
//! - [`background`] -- scheduled session cleanup.
//!
//! Every public operation returns `Result<_, AuthError>` with internal-only
//! variants already collapsed by [`AuthError::into_public`].

use std::sync::Arc;

use keyward_core::clock::{Clock, SystemClock};
use keyward_core::error::AuthError;
use keyward_core::types::{DbId, Timestamp};
use keyward_db::models::session::CreateSession;
use keyward_db::models::user::User;
use keyward_db::AuthStore;

pub mod background;
pub mod config;
pub mod engine;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod revocation;
pub mod rotation;

pub use config::{AuthConfig, ConfigError, JwtConfig, PasswordConfig, SigningKey};
pub use jwt::{Claims, TokenCodec, TokenPair, TokenType};
pub use principal::{AuthSession, ClientInfo, PrincipalView, RegistrationProfile, SessionView};

use crate::jwt::{generate_session_id, hash_refresh_token};
use crate::password::PasswordHasher;
use crate::principal::to_principal_view;

/// Upper bound on the length of a presented token string.
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Password hashed once at startup and verified against when the identifier
/// is unknown, so both paths cost one Argon2 verification.
const DUMMY_PASSWORD: &str = "keyward-timing-equalizer";

/// The authentication and session-lifecycle service.
///
/// Cheap to clone; all clones share the same store and configuration.
pub struct AuthService<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    store: Arc<S>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    dummy_hash: String,
}

impl<S> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AuthStore + 'static> AuthService<S> {
    /// Build a service on the system clock.
    pub fn new(store: Arc<S>, config: AuthConfig) -> Result<Self, ConfigError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Build a service on an explicit clock.
    pub fn with_clock(
        store: Arc<S>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let codec = TokenCodec::new(&config.jwt)?;
        let hasher = PasswordHasher::new(&config.password)?;
        let dummy_hash = hasher
            .hash_password(DUMMY_PASSWORD)
            .map_err(|e| ConfigError::PasswordParams(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                codec,
                hasher,
                config,
                clock,
                dummy_hash,
            }),
        })
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    fn now(&self) -> Timestamp {
        self.inner.clock.now()
    }

    /// Mint a token pair for `user` and the session row that backs it.
    fn mint(
        &self,
        user: &User,
        client: &ClientInfo,
        previous_session_id: Option<DbId>,
        now: Timestamp,
    ) -> Result<(TokenPair, CreateSession), AuthError> {
        let session_id = generate_session_id();
        let tokens = self
            .inner
            .codec
            .issue_pair(user.id, &user.roles, &session_id, now)?;

        let input = CreateSession {
            user_id: user.id,
            session_id,
            refresh_token_hash: hash_refresh_token(&tokens.refresh_token),
            expires_at: tokens.refresh_expires_at,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            previous_session_id,
        };
        Ok((tokens, input))
    }

    /// Issue a token pair and persist a fresh session (no predecessor).
    async fn issue_session(
        &self,
        user: &User,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<AuthSession, AuthError> {
        let (tokens, input) = self.mint(user, client, None, now)?;
        let session = self.inner.store.create_session(&input, now).await?;

        tracing::debug!(user_id = user.id, session_id = session.id, "Session created");

        Ok(AuthSession {
            principal: to_principal_view(user),
            tokens,
        })
    }
}

/// Reject empty or oversized token strings before any store access.
fn check_token_shape(token: &str) -> Result<(), AuthError> {
    if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
        return Err(AuthError::TokenInvalid);
    }
    Ok(())
}
