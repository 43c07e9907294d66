use keyward_core::error::AuthError;

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Failure raised by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return StoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
        StoreError::Database(err)
    }
}

/// Store failures never cross the engine boundary as-is: the raw cause is
/// logged here and replaced by a sanitized [`AuthError`].
impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
            StoreError::Database(db_err) => {
                tracing::error!(error = %db_err, "Store operation failed");
                AuthError::Internal("storage failure".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn database_errors_are_sanitized() {
        let err: AuthError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_matches!(err, AuthError::Internal(msg) if msg == "storage failure");
    }

    #[test]
    fn conflicts_stay_conflicts() {
        let err: AuthError = StoreError::Conflict("dup".into()).into();
        assert_matches!(err, AuthError::Conflict(_));
    }
}
