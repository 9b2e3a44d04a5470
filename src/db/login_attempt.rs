//! Login attempt audit log and lockout counters.

use chrono::{DateTime, Utc};

use super::{sql_timestamp, DbPool};
use crate::Result;

/// Why a login attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// No user matched the identifier.
    UserNotFound,
    /// The password did not verify.
    InvalidPassword,
    /// Credentials were valid but the account is inactive or suspended.
    AccountDisabled,
    /// The identifier was locked out.
    AccountLocked,
}

impl FailureReason {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UserNotFound => "user_not_found",
            FailureReason::InvalidPassword => "invalid_password",
            FailureReason::AccountDisabled => "account_disabled",
            FailureReason::AccountLocked => "account_locked",
        }
    }

    /// Whether this failure counts towards a lockout.
    pub fn counts_towards_lockout(&self) -> bool {
        matches!(
            self,
            FailureReason::UserNotFound | FailureReason::InvalidPassword
        )
    }
}

/// A login attempt to record.
#[derive(Debug, Clone)]
pub struct NewLoginAttempt<'a> {
    /// Identifier as typed by the caller.
    pub identifier: &'a str,
    /// Client IP address.
    pub ip_address: Option<&'a str>,
    /// None on success.
    pub failure: Option<FailureReason>,
}

/// Repository for login attempts.
pub struct LoginAttemptRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> LoginAttemptRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record an attempt.
    pub async fn record(&self, attempt: &NewLoginAttempt<'_>) -> Result<()> {
        sqlx::query(
            "INSERT INTO login_attempts (identifier, ip_address, success, failure_reason, attempted_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(attempt.identifier)
        .bind(attempt.ip_address)
        .bind(attempt.failure.is_none())
        .bind(attempt.failure.map(|f| f.as_str()))
        .bind(sql_timestamp(Utc::now()))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Failures counting towards lockout since `since`, and the oldest of them.
    ///
    /// Only failures after the most recent success or unlock are counted.
    pub async fn recent_failures(
        &self,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<(u32, Option<DateTime<Utc>>)> {
        let (count, oldest): (i64, Option<String>) = sqlx::query_as(
            "SELECT COUNT(*), MIN(attempted_at) FROM login_attempts
             WHERE identifier = ?
               AND success = 0
               AND failure_reason IN ('user_not_found', 'invalid_password')
               AND attempted_at > ?
               AND attempted_at > COALESCE(
                   (SELECT MAX(attempted_at) FROM login_attempts
                    WHERE identifier = ? AND success = 1),
                   '')",
        )
        .bind(identifier)
        .bind(sql_timestamp(since))
        .bind(identifier)
        .fetch_one(self.pool)
        .await?;

        let oldest = oldest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok((count.max(0) as u32, oldest))
    }

    /// Clear failure counters for an identifier.
    ///
    /// Deletes the failures that count towards lockout; all other rows stay.
    pub async fn clear_failures(&self, identifier: &str) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM login_attempts
             WHERE identifier = ? AND success = 0
               AND failure_reason IN ('user_not_found', 'invalid_password')",
        )
        .bind(identifier)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count all recorded attempts for an identifier.
    pub async fn count_for(&self, identifier: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts WHERE identifier = ?")
                .bind(identifier)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Failure reason of the most recent attempt for an identifier.
    pub async fn last_failure_reason(&self, identifier: &str) -> Result<Option<String>> {
        let reason: Option<Option<String>> = sqlx::query_scalar(
            "SELECT failure_reason FROM login_attempts
             WHERE identifier = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(self.pool)
        .await?;
        Ok(reason.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Duration;

    fn failure(identifier: &str, reason: FailureReason) -> NewLoginAttempt<'_> {
        NewLoginAttempt {
            identifier,
            ip_address: Some("10.0.0.1"),
            failure: Some(reason),
        }
    }

    #[tokio::test]
    async fn test_record_and_count_failures() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LoginAttemptRepository::new(db.pool());
        let since = Utc::now() - Duration::minutes(15);

        repo.record(&failure("ada", FailureReason::InvalidPassword))
            .await
            .unwrap();
        repo.record(&failure("ada", FailureReason::UserNotFound))
            .await
            .unwrap();
        repo.record(&failure("ada", FailureReason::AccountDisabled))
            .await
            .unwrap();
        repo.record(&failure("other", FailureReason::InvalidPassword))
            .await
            .unwrap();

        let (count, oldest) = repo.recent_failures("ada", since).await.unwrap();
        assert_eq!(count, 2);
        assert!(oldest.is_some());
        assert_eq!(repo.count_for("ada").await.unwrap(), 3);
        assert_eq!(
            repo.last_failure_reason("ada").await.unwrap().as_deref(),
            Some("account_disabled")
        );
    }

    #[tokio::test]
    async fn test_identifier_is_case_insensitive() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LoginAttemptRepository::new(db.pool());
        repo.record(&failure("Ada@Example.com", FailureReason::InvalidPassword))
            .await
            .unwrap();

        let (count, _) = repo
            .recent_failures("ada@example.com", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_success_resets_window() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LoginAttemptRepository::new(db.pool());
        let since = Utc::now() - Duration::minutes(15);

        repo.record(&failure("ada", FailureReason::InvalidPassword))
            .await
            .unwrap();
        // Timestamps have millisecond resolution.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.record(&NewLoginAttempt {
            identifier: "ada",
            ip_address: None,
            failure: None,
        })
        .await
        .unwrap();

        let (count, _) = repo.recent_failures("ada", since).await.unwrap();
        assert_eq!(count, 0);
        assert!(repo.last_failure_reason("ada").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_failures() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LoginAttemptRepository::new(db.pool());
        for _ in 0..3 {
            repo.record(&failure("ada", FailureReason::InvalidPassword))
                .await
                .unwrap();
        }
        repo.record(&failure("ada", FailureReason::AccountLocked))
            .await
            .unwrap();

        assert_eq!(repo.clear_failures("ada").await.unwrap(), 3);
        let (count, _) = repo
            .recent_failures("ada", Utc::now() - Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(repo.count_for("ada").await.unwrap(), 1);
    }

    #[test]
    fn test_failure_reason_strings() {
        assert_eq!(FailureReason::UserNotFound.as_str(), "user_not_found");
        assert!(FailureReason::InvalidPassword.counts_towards_lockout());
        assert!(!FailureReason::AccountLocked.counts_towards_lockout());
        assert!(!FailureReason::AccountDisabled.counts_towards_lockout());
    }
}
