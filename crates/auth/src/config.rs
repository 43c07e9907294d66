//! Engine configuration.
//!
//! Everything the engine needs is passed to [`crate::AuthService::new`] in an
//! [`AuthConfig`]; business logic never reads the environment. Binaries build
//! the struct with [`AuthConfig::from_env`].

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use keyward_core::lockout::{
    LockoutPolicy, DEFAULT_LOCK_DURATION_MINS, DEFAULT_MAX_FAILED_ATTEMPTS,
};
use keyward_core::roles::DEFAULT_ROLE;

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
/// Default minimum password length at registration and password change.
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 8;
/// Default number of days revoked sessions are kept for incident review.
const DEFAULT_REVOKED_RETENTION_DAYS: i64 = 30;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid signing key: {0}")]
    SigningKey(String),

    #[error("Invalid password hashing parameters: {0}")]
    PasswordParams(String),
}

/// Key material used to sign and verify tokens.
#[derive(Clone)]
pub enum SigningKey {
    /// Shared secret, HS256.
    Hmac { secret: String },
    /// PEM-encoded RSA key pair, RS256.
    Rsa {
        private_pem: String,
        public_pem: String,
    },
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKey::Hmac { .. } => f.write_str("SigningKey::Hmac(<redacted>)"),
            SigningKey::Rsa { .. } => f.write_str("SigningKey::Rsa(<redacted>)"),
        }
    }
}

/// Configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub signing_key: SigningKey,
    /// Expected and emitted `iss` claim, if any.
    pub issuer: Option<String>,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// HS256 configuration with default lifetimes.
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            signing_key: SigningKey::Hmac {
                secret: secret.into(),
            },
            issuer: None,
            access_token_expiry_mins: DEFAULT_ACCESS_EXPIRY_MINS,
            refresh_token_expiry_days: DEFAULT_REFRESH_EXPIRY_DAYS,
        }
    }
}

/// Argon2id cost parameters and password rules.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub min_length: usize,
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    pub lockout: LockoutPolicy,
    pub password: PasswordConfig,
    /// Role label assigned at registration.
    pub default_role: String,
    /// Retention window used by scheduled cleanup of revoked sessions.
    pub revoked_retention_days: i64,
}

impl AuthConfig {
    /// Configuration with the given token settings and defaults elsewhere.
    pub fn new(jwt: JwtConfig) -> Self {
        Self {
            jwt,
            lockout: LockoutPolicy::default(),
            password: PasswordConfig::default(),
            default_role: DEFAULT_ROLE.to_string(),
            revoked_retention_days: DEFAULT_REVOKED_RETENTION_DAYS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                          | Required | Default          |
    /// |----------------------------------|----------|------------------|
    /// | `JWT_SECRET`                     | yes\*    | --               |
    /// | `JWT_PRIVATE_KEY_PEM`            | no       | --               |
    /// | `JWT_PUBLIC_KEY_PEM`             | no       | --               |
    /// | `JWT_ISSUER`                     | no       | --               |
    /// | `JWT_ACCESS_EXPIRY_MINS`         | no       | `15`             |
    /// | `JWT_REFRESH_EXPIRY_DAYS`        | no       | `7`              |
    /// | `LOCKOUT_MAX_ATTEMPTS`           | no       | `5`              |
    /// | `LOCKOUT_DURATION_MINS`          | no       | `15`             |
    /// | `PASSWORD_MIN_LENGTH`            | no       | `8`              |
    /// | `PASSWORD_MEMORY_KIB`            | no       | argon2 default   |
    /// | `PASSWORD_ITERATIONS`            | no       | argon2 default   |
    /// | `PASSWORD_PARALLELISM`           | no       | argon2 default   |
    /// | `DEFAULT_ROLE`                   | no       | `user`           |
    /// | `SESSION_REVOKED_RETENTION_DAYS` | no       | `30`             |
    ///
    /// \* Unless both PEM variables are set, which selects RS256.
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_key = match (
            non_empty_var("JWT_PRIVATE_KEY_PEM"),
            non_empty_var("JWT_PUBLIC_KEY_PEM"),
        ) {
            (Some(private_pem), Some(public_pem)) => SigningKey::Rsa {
                private_pem,
                public_pem,
            },
            _ => SigningKey::Hmac {
                secret: non_empty_var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            },
        };

        let jwt = JwtConfig {
            signing_key,
            issuer: non_empty_var("JWT_ISSUER"),
            access_token_expiry_mins: positive_var(
                "JWT_ACCESS_EXPIRY_MINS",
                DEFAULT_ACCESS_EXPIRY_MINS,
            )?,
            refresh_token_expiry_days: positive_var(
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
            )?,
        };

        bounded_span(
            "JWT_ACCESS_EXPIRY_MINS",
            jwt.access_token_expiry_mins,
            chrono::Duration::try_minutes,
        )?;
        bounded_span(
            "JWT_REFRESH_EXPIRY_DAYS",
            jwt.refresh_token_expiry_days,
            chrono::Duration::try_days,
        )?;

        let lockout = LockoutPolicy {
            max_failed_attempts: positive_var("LOCKOUT_MAX_ATTEMPTS", DEFAULT_MAX_FAILED_ATTEMPTS)?,
            lock_duration: bounded_span(
                "LOCKOUT_DURATION_MINS",
                positive_var("LOCKOUT_DURATION_MINS", DEFAULT_LOCK_DURATION_MINS)?,
                chrono::Duration::try_minutes,
            )?,
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            min_length: parse_var("PASSWORD_MIN_LENGTH", defaults.min_length)?,
            memory_kib: parse_var("PASSWORD_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_var("PASSWORD_ITERATIONS", defaults.iterations)?,
            parallelism: parse_var("PASSWORD_PARALLELISM", defaults.parallelism)?,
        };

        let revoked_retention_days = parse_var(
            "SESSION_REVOKED_RETENTION_DAYS",
            DEFAULT_REVOKED_RETENTION_DAYS,
        )?;
        if revoked_retention_days != 0 {
            bounded_span(
                "SESSION_REVOKED_RETENTION_DAYS",
                revoked_retention_days,
                chrono::Duration::try_days,
            )?;
        }

        Ok(Self {
            jwt,
            lockout,
            password,
            default_role: non_empty_var("DEFAULT_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            revoked_retention_days,
        })
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn positive_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + fmt::Display,
{
    let value = parse_var(var, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Convert a count of `unit`s into a positive span that can be added to the
/// current time without leaving the representable range.
pub(crate) fn bounded_span(
    var: &'static str,
    value: i64,
    unit: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration, ConfigError> {
    unit(value)
        .filter(|span| {
            *span > chrono::Duration::zero() && Utc::now().checked_add_signed(*span).is_some()
        })
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
}
