//! Argon2id password hashing and verification.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself; a hash
//! produced under older cost parameters still verifies after they change.
//!
//! Hashing is CPU- and memory-bound, so the async entry points run it on the
//! blocking thread pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use keyward_core::error::AuthError;

use crate::config::{ConfigError, PasswordConfig};

/// Argon2id hasher with fixed cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, ConfigError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| ConfigError::PasswordParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password using Argon2id with a random salt.
    ///
    /// Returns the PHC-formatted hash string (includes algorithm, params, salt, and hash).
    pub fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC-formatted Argon2id hash.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
    pub fn verify_password(
        &self,
        password: &str,
        hash: &str,
    ) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;
        match self
            .argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// [`Self::hash_password`] on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("Password hashing error: {e}")))
    }

    /// [`Self::verify_password`] on the blocking pool.
    ///
    /// A stored hash that cannot be parsed is an internal error, not a
    /// mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("Password verification error: {e}")))
    }
}
