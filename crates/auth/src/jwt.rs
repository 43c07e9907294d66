//! Token codec: access and refresh JWTs plus refresh-token helpers.
//!
//! Both token kinds carry a [`Claims`] payload. Access tokens are stateless
//! and verified by signature and expiry alone. Refresh tokens additionally
//! carry the `sid` claim binding them to a stored session; only the SHA-256
//! hash of a refresh token is ever persisted, so a database leak does not
//! compromise active sessions.
//!
//! Expiry is checked against the caller-supplied `now` rather than the
//! system clock so that the whole engine follows one time source.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keyward_core::error::AuthError;
use keyward_core::types::{DbId, Timestamp};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{bounded_span, ConfigError, JwtConfig, SigningKey};

/// Length of the random `sid` value.
pub const SESSION_ID_LENGTH: usize = 32;

/// Which of the two token kinds a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Opaque role labels.
    pub roles: Vec<String>,
    /// Token kind marker, so a refresh token is never accepted as an access
    /// token and vice versa.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Session binding; present on refresh tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier.
    pub jti: String,
}

/// A freshly minted access + refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

/// Signs and verifies tokens with one configured key.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        let (algorithm, encoding_key, decoding_key) = match &config.signing_key {
            SigningKey::Hmac { secret } => {
                if secret.is_empty() {
                    return Err(ConfigError::SigningKey("secret must not be empty".into()));
                }
                (
                    Algorithm::HS256,
                    EncodingKey::from_secret(secret.as_bytes()),
                    DecodingKey::from_secret(secret.as_bytes()),
                )
            }
            SigningKey::Rsa {
                private_pem,
                public_pem,
            } => (
                Algorithm::RS256,
                EncodingKey::from_rsa_pem(private_pem.as_bytes())
                    .map_err(|e| ConfigError::SigningKey(format!("private key: {e}")))?,
                DecodingKey::from_rsa_pem(public_pem.as_bytes())
                    .map_err(|e| ConfigError::SigningKey(format!("public key: {e}")))?,
            ),
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            issuer: config.issuer.clone(),
            access_ttl: bounded_span(
                "JWT_ACCESS_EXPIRY_MINS",
                config.access_token_expiry_mins,
                chrono::Duration::try_minutes,
            )?,
            refresh_ttl: bounded_span(
                "JWT_REFRESH_EXPIRY_DAYS",
                config.refresh_token_expiry_days,
                chrono::Duration::try_days,
            )?,
        })
    }

    /// Mint an access token and a refresh token bound to `session_id`.
    pub fn issue_pair(
        &self,
        user_id: DbId,
        roles: &[String],
        session_id: &str,
        now: Timestamp,
    ) -> Result<TokenPair, AuthError> {
        let access_expires_at = expiry(now, self.access_ttl)?;
        let refresh_expires_at = expiry(now, self.refresh_ttl)?;

        let access_token =
            self.sign(user_id, roles, TokenType::Access, None, now, access_expires_at)?;
        let refresh_token = self.sign(
            user_id,
            roles,
            TokenType::Refresh,
            Some(session_id),
            now,
            refresh_expires_at,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.access_ttl.num_seconds(),
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Validate an access token: signature, kind, and expiry.
    pub fn verify_access(&self, token: &str, now: Timestamp) -> Result<Claims, AuthError> {
        self.verify(token, TokenType::Access, now)
    }

    /// Validate a refresh token: signature, kind, expiry, and presence of `sid`.
    ///
    /// This is only half of refresh validation; the session store must also
    /// be consulted.
    pub fn verify_refresh(&self, token: &str, now: Timestamp) -> Result<Claims, AuthError> {
        let claims = self.verify(token, TokenType::Refresh, now)?;
        if claims.sid.as_deref().map_or(true, str::is_empty) {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }

    fn sign(
        &self,
        user_id: DbId,
        roles: &[String],
        token_type: TokenType,
        session_id: Option<&str>,
        now: Timestamp,
        expires_at: Timestamp,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            roles: roles.to_vec(),
            token_type,
            sid: session_id.map(str::to_string),
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token generation error: {e}")))
    }

    fn verify(
        &self,
        token: &str,
        expected: TokenType,
        now: Timestamp,
    ) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below against the engine clock.
        validation.validate_exp = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?
            .claims;

        if claims.token_type != expected {
            return Err(AuthError::TokenInvalid);
        }
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

fn expiry(now: Timestamp, ttl: chrono::Duration) -> Result<Timestamp, AuthError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal("Token expiry out of range".into()))
}

/// Generate the random, unguessable `sid` for a new session.
pub fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Compute the SHA-256 hex digest of a refresh token.
///
/// Use this to compare an incoming refresh token against the stored hash.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    /// Helper to build a codec with a known secret.
    fn test_codec() -> TokenCodec {
        TokenCodec::new(&JwtConfig::hmac("test-secret-that-is-long-enough-for-hmac"))
            .expect("codec should build")
    }

    fn roles() -> Vec<String> {
        vec!["user".to_string()]
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let codec = test_codec();
        let now = Utc::now();
        let pair = codec.issue_pair(42, &roles(), "sid-1", now).unwrap();

        let access = codec.verify_access(&pair.access_token, now).unwrap();
        assert_eq!(access.sub, 42);
        assert_eq!(access.roles, roles());
        assert_eq!(access.token_type, TokenType::Access);
        assert!(access.sid.is_none());

        let refresh = codec.verify_refresh(&pair.refresh_token, now).unwrap();
        assert_eq!(refresh.sid.as_deref(), Some("sid-1"));
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(pair.expires_in, 15 * 60);
        assert_eq!(pair.refresh_expires_at, now + Duration::days(7));
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let codec = test_codec();
        let now = Utc::now();
        let pair = codec.issue_pair(1, &roles(), "sid-1", now).unwrap();

        assert_matches!(
            codec.verify_access(&pair.refresh_token, now),
            Err(AuthError::TokenInvalid)
        );
        assert_matches!(
            codec.verify_refresh(&pair.access_token, now),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_expiry_follows_supplied_clock() {
        let codec = test_codec();
        let now = Utc::now();
        let pair = codec.issue_pair(1, &roles(), "sid-1", now).unwrap();

        let later = now + Duration::minutes(16);
        assert_matches!(
            codec.verify_access(&pair.access_token, later),
            Err(AuthError::TokenExpired)
        );
        assert!(codec.verify_refresh(&pair.refresh_token, later).is_ok());
    }

    #[test]
    fn test_different_secrets_fail() {
        let codec_a = TokenCodec::new(&JwtConfig::hmac("secret-alpha")).unwrap();
        let codec_b = TokenCodec::new(&JwtConfig::hmac("secret-bravo")).unwrap();
        let now = Utc::now();
        let pair = codec_a.issue_pair(1, &roles(), "sid-1", now).unwrap();

        assert_matches!(
            codec_b.verify_access(&pair.access_token, now),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_issuer_mismatch_fails() {
        let mut config = JwtConfig::hmac("shared");
        config.issuer = Some("keyward-a".into());
        let issuing = TokenCodec::new(&config).unwrap();
        config.issuer = Some("keyward-b".into());
        let verifying = TokenCodec::new(&config).unwrap();

        let now = Utc::now();
        let pair = issuing.issue_pair(1, &roles(), "sid-1", now).unwrap();
        assert!(issuing.verify_access(&pair.access_token, now).is_ok());
        assert_matches!(
            verifying.verify_access(&pair.access_token, now),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_matches!(
            test_codec().verify_refresh("not.a.jwt", Utc::now()),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(TokenCodec::new(&JwtConfig::hmac("")).is_err());
    }

    #[test]
    fn test_unrepresentable_lifetimes_rejected() {
        let mut config = JwtConfig::hmac("secret");
        config.refresh_token_expiry_days = 200_000_000;
        assert_matches!(
            TokenCodec::new(&config),
            Err(ConfigError::Invalid { var: "JWT_REFRESH_EXPIRY_DAYS", .. })
        );

        let mut config = JwtConfig::hmac("secret");
        config.access_token_expiry_mins = i64::MAX;
        assert_matches!(
            TokenCodec::new(&config),
            Err(ConfigError::Invalid { var: "JWT_ACCESS_EXPIRY_MINS", .. })
        );

        let mut config = JwtConfig::hmac("secret");
        config.access_token_expiry_mins = 0;
        assert!(TokenCodec::new(&config).is_err());
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let now = chrono::DateTime::<Utc>::MAX_UTC - Duration::days(1);
        assert_matches!(
            test_codec().issue_pair(1, &roles(), "sid-1", now),
            Err(AuthError::Internal(_))
        );
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let codec = test_codec();
        let now = Utc::now();
        let a = codec.issue_pair(1, &roles(), "sid-1", now).unwrap();
        let b = codec.issue_pair(1, &roles(), "sid-1", now).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn test_refresh_token_hash_is_stable_hex() {
        let hash = hash_refresh_token("token");
        assert_eq!(hash, hash_refresh_token("token"));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, hash_refresh_token("token2"));
    }

    #[test]
    fn test_session_ids_are_random_alphanumeric() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), SESSION_ID_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
