//! Email verification tokens.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::{new_id, sql_timestamp, DbPool};
use crate::Result;

/// Email verification entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailVerification {
    /// Row ID.
    pub id: String,
    /// User the token belongs to.
    pub user_id: String,
    /// 64 hex chars.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
    /// Whether the token has been used.
    pub verified: bool,
    /// When the token was used.
    pub verified_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl EmailVerification {
    /// Whether the token has passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Repository for email verification tokens.
pub struct EmailVerificationRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> EmailVerificationRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new token.
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO email_verifications (id, user_id, token, expires_at, verified, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(new_id())
        .bind(user_id)
        .bind(token)
        .bind(sql_timestamp(expires_at))
        .bind(sql_timestamp(Utc::now()))
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Get a verification by token.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<EmailVerification>> {
        let row = sqlx::query_as::<_, EmailVerification>(
            "SELECT id, user_id, token, expires_at, verified, verified_at, created_at
             FROM email_verifications WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Get the newest pending token of a user.
    pub async fn latest_pending_for_user(&self, user_id: &str) -> Result<Option<EmailVerification>> {
        let row = sqlx::query_as::<_, EmailVerification>(
            "SELECT id, user_id, token, expires_at, verified, verified_at, created_at
             FROM email_verifications
             WHERE user_id = ? AND verified = 0
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Mark a token as used.
    pub async fn mark_verified(conn: &mut SqliteConnection, id: &str) -> Result<()> {
        sqlx::query("UPDATE email_verifications SET verified = 1, verified_at = ? WHERE id = ?")
            .bind(sql_timestamp(Utc::now()))
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Remove every pending token of a user.
    pub async fn delete_pending_for_user(conn: &mut SqliteConnection, user_id: &str) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM email_verifications WHERE user_id = ? AND verified = 0")
                .bind(user_id)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }
}
