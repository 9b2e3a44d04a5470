//! Session repository: one row per issued refresh token.
//!
//! Only the SHA-256 digest of a refresh token is stored. Rows are never
//! deleted here; they are deactivated on rotation, logout, status change or
//! expiry and kept for audit.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::{sql_timestamp, DbPool};
use crate::Result;

/// Session entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Session ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// SHA-256 hex digest of the refresh token.
    pub refresh_token_hash: String,
    /// Client user agent at issue time.
    pub user_agent: Option<String>,
    /// Client IP address at issue time.
    pub ip_address: Option<String>,
    /// Whether the refresh token may still be used.
    pub is_active: bool,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// New session for creation.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Session ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// SHA-256 hex digest of the refresh token.
    pub refresh_token_hash: String,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, user_agent, ip_address,
     is_active, expires_at, created_at, updated_at";

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a session row.
    pub async fn insert(conn: &mut SqliteConnection, session: &NewSession) -> Result<()> {
        let now = sql_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO user_sessions (id, user_id, refresh_token_hash, user_agent, ip_address,
                                        is_active, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(sql_timestamp(session.expires_at))
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Create a session outside of any larger unit of work.
    pub async fn create(&self, session: &NewSession) -> Result<Session> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, session).await?;
        drop(conn);

        self.get_by_id(&session.id)
            .await?
            .ok_or_else(|| crate::AegisError::NotFound("session".into()))
    }

    /// Get a session by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE id = ?");
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(session)
    }

    /// Get a session by refresh token digest, whatever its state.
    pub async fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE refresh_token_hash = ?");
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(token_hash)
            .fetch_optional(self.pool)
            .await?;
        Ok(session)
    }

    /// Deactivate a session only if it is still active.
    ///
    /// Returns true for exactly one caller when several race on the same row.
    pub async fn deactivate_if_active(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = 0, updated_at = ?
             WHERE id = ? AND is_active = 1",
        )
        .bind(sql_timestamp(Utc::now()))
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Rotate a session: deactivate `old_id` and insert `replacement` atomically.
    ///
    /// Returns false (and writes nothing) if `old_id` was no longer active.
    pub async fn rotate(&self, old_id: &str, replacement: &NewSession) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if !Self::deactivate_if_active(&mut tx, old_id).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        Self::insert(&mut tx, replacement).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Deactivate the session holding the given refresh token digest for a user.
    pub async fn deactivate_by_token_hash(&self, user_id: &str, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = 0, updated_at = ?
             WHERE refresh_token_hash = ? AND user_id = ? AND is_active = 1",
        )
        .bind(sql_timestamp(Utc::now()))
        .bind(token_hash)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deactivate every active session of a user.
    pub async fn deactivate_all_for_user(conn: &mut SqliteConnection, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = 0, updated_at = ?
             WHERE user_id = ? AND is_active = 1",
        )
        .bind(sql_timestamp(Utc::now()))
        .bind(user_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// List a user's active, unexpired sessions, newest first.
    pub async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions
             WHERE user_id = ? AND is_active = 1 AND expires_at > ?
             ORDER BY created_at DESC, id"
        );
        let sessions = sqlx::query_as::<_, Session>(&sql)
            .bind(user_id)
            .bind(sql_timestamp(Utc::now()))
            .fetch_all(self.pool)
            .await?;
        Ok(sessions)
    }

    /// Deactivate sessions whose expiry has passed.
    ///
    /// Returns the number of sessions deactivated.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let now = sql_timestamp(Utc::now());
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = 0, updated_at = ?
             WHERE is_active = 1 AND expires_at <= ?",
        )
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
