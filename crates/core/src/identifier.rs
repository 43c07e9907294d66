//! Login identifier and password input checks.
//!
//! These run before any store access. The error message deliberately does
//! not say which of the two inputs was malformed.

use validator::ValidateEmail;

use crate::error::AuthError;

/// Generic message for malformed credential input.
pub const BAD_FORMAT_MESSAGE: &str = "Invalid identifier or password format";

/// Canonical form of an identifier: trimmed and lower-cased.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Check the shape of a credential pair and return the normalized identifier.
///
/// The identifier must be a syntactically valid address and the password
/// must be non-empty after trimming.
pub fn validate_credentials_input(identifier: &str, password: &str) -> Result<String, AuthError> {
    let normalized = normalize_identifier(identifier);
    if normalized.is_empty() || !normalized.validate_email() || password.trim().is_empty() {
        return Err(AuthError::Validation(BAD_FORMAT_MESSAGE.to_string()));
    }
    Ok(normalized)
}

/// Validate that a new password meets the minimum length requirement.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.trim().chars().count() < min_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_identifier("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn accepts_address_and_returns_normalized_form() {
        let id = validate_credentials_input("Alice@Example.com", "hunter22").unwrap();
        assert_eq!(id, "alice@example.com");
    }

    #[test]
    fn rejects_non_address_identifier() {
        assert_matches!(
            validate_credentials_input("alice", "hunter22"),
            Err(AuthError::Validation(msg)) if msg == BAD_FORMAT_MESSAGE
        );
    }

    #[test]
    fn rejects_blank_password_with_same_message() {
        assert_matches!(
            validate_credentials_input("alice@example.com", "   "),
            Err(AuthError::Validation(msg)) if msg == BAD_FORMAT_MESSAGE
        );
    }

    #[test]
    fn password_strength_boundary() {
        assert!(validate_password_strength("12345678", 8).is_ok());
        assert_matches!(
            validate_password_strength("1234567", 8),
            Err(AuthError::Validation(msg)) if msg.contains("at least 8 characters")
        );
    }
}
