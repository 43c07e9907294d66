//! Brute-force lockout policy.
//!
//! Pure decisions over a credential record's `(failed_login_count,
//! locked_until)` pair. The store performs the counter increment atomically
//! and hands the resulting count back here; this module only decides what
//! that count means.

use chrono::{DateTime, Utc};

use crate::types::Timestamp;

/// Default number of consecutive failures that triggers a lock.
pub const DEFAULT_MAX_FAILED_ATTEMPTS: i32 = 5;

/// Default lock duration in minutes.
pub const DEFAULT_LOCK_DURATION_MINS: i64 = 15;

/// Outcome of the pre-verification lock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutDecision {
    Allowed,
    Locked { until: Timestamp },
}

/// What to persist after a failed password comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureUpdate {
    /// Counter value after the atomic increment.
    pub failed_attempts: i32,
    /// Lock to apply, if the threshold was reached.
    pub lock_until: Option<Timestamp>,
}

/// What to persist after a successful password comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessUpdate {
    pub failed_attempts: i32,
    pub locked_until: Option<Timestamp>,
    pub last_login_at: Timestamp,
}

/// Threshold and duration of the lockout rule.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_failed_attempts: i32,
    pub lock_duration: chrono::Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lock_duration: chrono::Duration::minutes(DEFAULT_LOCK_DURATION_MINS),
        }
    }
}

impl LockoutPolicy {
    /// Reject when a lock is still in force.
    ///
    /// Runs before the password comparison, independent of whether the
    /// password would have matched.
    pub fn check(&self, locked_until: Option<Timestamp>, now: Timestamp) -> LockoutDecision {
        match locked_until {
            Some(until) if until > now => LockoutDecision::Locked { until },
            _ => LockoutDecision::Allowed,
        }
    }

    /// Decide the update for a failed attempt.
    ///
    /// `new_count` is the value returned by the store's atomic increment.
    /// An existing lock is never shortened. A lock that would end past the
    /// latest representable instant ends at that instant instead.
    pub fn on_failure(
        &self,
        new_count: i32,
        current_lock: Option<Timestamp>,
        now: Timestamp,
    ) -> FailureUpdate {
        let lock_until = if new_count >= self.max_failed_attempts {
            let proposed = now
                .checked_add_signed(self.lock_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            Some(match current_lock {
                Some(existing) if existing > proposed => existing,
                _ => proposed,
            })
        } else {
            None
        };

        FailureUpdate {
            failed_attempts: new_count,
            lock_until,
        }
    }

    /// Reset instruction for a successful attempt.
    pub fn on_success(&self, now: Timestamp) -> SuccessUpdate {
        SuccessUpdate {
            failed_attempts: 0,
            locked_until: None,
            last_login_at: now,
        }
    }
}
