//! Caller-facing views and inputs.
//!
//! Credential and session rows carry secrets (password hash, refresh token
//! hash). Nothing leaves the engine except through the views in this module.

use keyward_core::types::{DbId, Timestamp};
use keyward_db::models::session::Session;
use keyward_db::models::user::User;
use serde::Serialize;

use crate::jwt::TokenPair;

/// Sanitized principal returned by authentication (no password hash, no
/// lockout counters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalView {
    pub id: DbId,
    pub identifier: String,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// The one mapping from a credential record to its public shape.
pub fn to_principal_view(user: &User) -> PrincipalView {
    PrincipalView {
        id: user.id,
        identifier: user.identifier.clone(),
        display_name: user.display_name.clone(),
        roles: user.roles.clone(),
        is_active: user.is_active,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    }
}

/// A live session as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: DbId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

pub fn to_session_view(session: &Session) -> SessionView {
    SessionView {
        id: session.id,
        ip_address: session.ip_address.clone(),
        user_agent: session.user_agent.clone(),
        created_at: session.created_at,
        expires_at: session.expires_at,
        last_used_at: session.last_used_at,
    }
}

/// Informational client metadata recorded on a session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Optional profile data supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct RegistrationProfile {
    pub display_name: Option<String>,
}

/// Result of login, registration and rotation: who, plus a fresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub principal: PrincipalView,
    pub tokens: TokenPair,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn principal_view_omits_secrets() {
        let now = Utc::now();
        let user = User {
            id: 7,
            identifier: "a@x.com".into(),
            display_name: Some("A".into()),
            password_hash: "$argon2id$secret".into(),
            roles: vec!["user".into()],
            is_active: true,
            failed_login_count: 3,
            locked_until: None,
            password_changed_at: None,
            last_login_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        let view = to_principal_view(&user);
        assert_eq!(view.id, 7);
        assert_eq!(view.roles, vec!["user".to_string()]);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("failed_login_count"));
    }
}
