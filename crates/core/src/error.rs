use crate::types::Timestamp;

/// Typed failure returned by every authentication and session operation.
///
/// [`AuthError::SessionReuseDetected`] is internal only: public entry points
/// pass their errors through [`AuthError::into_public`] so callers see
/// [`AuthError::TokenInvalid`] instead.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is temporarily locked until {until}")]
    AccountLocked { until: Timestamp },

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Refresh token reuse detected")]
    SessionReuseDetected,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Collapse internal-only distinctions into what a caller may observe.
    pub fn into_public(self) -> Self {
        match self {
            AuthError::SessionReuseDetected => AuthError::TokenInvalid,
            other => other,
        }
    }

    /// Stable machine-readable code for the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            // Reuse is reported under the same code as any other bad token.
            AuthError::TokenInvalid | AuthError::SessionReuseDetected => "TOKEN_INVALID",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message that is safe to show to the caller verbatim.
    ///
    /// Internal details and reuse detection are never echoed.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::InvalidCredentials => "Invalid identifier or password".to_string(),
            AuthError::AccountLocked { .. } => {
                "Account is temporarily locked. Try again later.".to_string()
            }
            AuthError::AccountInactive => "Account is deactivated".to_string(),
            AuthError::TokenExpired => "Token has expired".to_string(),
            AuthError::TokenInvalid | AuthError::SessionReuseDetected => {
                "Invalid or expired token".to_string()
            }
            AuthError::Conflict(msg) => msg.clone(),
            AuthError::NotFound => "Resource not found".to_string(),
            AuthError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn reuse_is_hidden_from_callers() {
        let err = AuthError::SessionReuseDetected;
        assert_eq!(err.code(), "TOKEN_INVALID");
        assert!(!err.public_message().to_lowercase().contains("reuse"));
        assert_matches!(err.into_public(), AuthError::TokenInvalid);
    }

    #[test]
    fn other_errors_pass_through_into_public() {
        assert_matches!(
            AuthError::InvalidCredentials.into_public(),
            AuthError::InvalidCredentials
        );
        assert_matches!(AuthError::TokenExpired.into_public(), AuthError::TokenExpired);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AuthError::Internal("connection refused on 10.0.0.5".into());
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
