//! Shared fixtures for the engine integration tests.
//!
//! Every test gets its own in-memory store and a manually driven clock, so
//! expiry and lockout windows are crossed by advancing time rather than
//! sleeping.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use keyward_auth::{
    AuthConfig, AuthService, AuthSession, ClientInfo, JwtConfig, PasswordConfig,
    RegistrationProfile,
};
use keyward_core::clock::{Clock, ManualClock};
use keyward_core::types::Timestamp;
use keyward_db::MemoryStore;

pub const PASSWORD: &str = "Secret123";

/// Service, store and clock wired together.
pub struct Harness {
    pub service: AuthService<MemoryStore>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

/// Default policy (5 attempts, 15 minutes, 15 minute / 7 day tokens) with
/// cheap hashing parameters.
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::new(JwtConfig::hmac("integration-test-secret"));
    config.password = PasswordConfig {
        min_length: 8,
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };
    config
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: AuthConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = AuthService::with_clock(store.clone(), config, clock.clone())
        .expect("service should build");
    Harness {
        service,
        store,
        clock,
    }
}

pub fn client(ip: &str) -> ClientInfo {
    ClientInfo {
        ip_address: Some(ip.to_string()),
        user_agent: Some("test-agent/1.0".to_string()),
    }
}

impl Harness {
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register `identifier` with [`PASSWORD`].
    pub async fn register(&self, identifier: &str) -> AuthSession {
        self.service
            .register(
                identifier,
                PASSWORD,
                RegistrationProfile::default(),
                &client("10.0.0.1"),
            )
            .await
            .expect("registration should succeed")
    }

    /// Open another session for an existing account.
    pub async fn login(&self, identifier: &str) -> AuthSession {
        self.service
            .login(identifier, PASSWORD, &client("10.0.0.2"))
            .await
            .expect("login should succeed")
    }
}
