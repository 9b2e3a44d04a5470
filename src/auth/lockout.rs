//! Failed-login lockout backed by the login attempt log.

use chrono::{DateTime, Duration, Utc};

use crate::db::{DbPool, LoginAttemptRepository};
use crate::Result;

/// Result of a lockout check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitResult {
    /// Login attempt is allowed.
    Allowed,
    /// Identifier is locked for the specified duration.
    Locked(Duration),
}

impl LimitResult {
    /// Remaining lockout in whole minutes, rounded up, at least one.
    pub fn remaining_minutes(&self) -> Option<i64> {
        match self {
            LimitResult::Allowed => None,
            LimitResult::Locked(d) => Some(((d.num_seconds() + 59) / 60).max(1)),
        }
    }
}

/// Failed login limiter.
///
/// Counts failures per identifier inside a sliding window. Reaching the limit
/// locks the identifier until the oldest counted failure leaves the window.
#[derive(Debug, Clone, Copy)]
pub struct LoginLimiter {
    max_attempts: u32,
    window: Duration,
}

impl LoginLimiter {
    /// Create a limiter.
    pub fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// Check whether `identifier` may attempt a login now.
    pub async fn check(&self, pool: &DbPool, identifier: &str) -> Result<LimitResult> {
        self.check_at(pool, identifier, Utc::now()).await
    }

    async fn check_at(
        &self,
        pool: &DbPool,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<LimitResult> {
        let (count, oldest) = LoginAttemptRepository::new(pool)
            .recent_failures(identifier, now - self.window)
            .await?;

        if count < self.max_attempts {
            return Ok(LimitResult::Allowed);
        }

        let remaining = oldest
            .map(|oldest| oldest + self.window - now)
            .unwrap_or(self.window);
        if remaining <= Duration::zero() {
            return Ok(LimitResult::Allowed);
        }
        Ok(LimitResult::Locked(remaining))
    }
}
