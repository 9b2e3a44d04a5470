//! User model and credential repository for Aegis.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::{sql_timestamp, DbPool};
use crate::Result;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Registered, email not yet verified.
    #[default]
    Pending,
    /// Fully active account.
    Active,
    /// Deactivated by an administrator or the user.
    Inactive,
    /// Blocked by an administrator.
    Suspended,
}

impl UserStatus {
    /// Convert status to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }

    /// Whether this status blocks login and refresh.
    pub fn is_disabled(&self) -> bool {
        matches!(self, UserStatus::Inactive | UserStatus::Suspended)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(UserStatus::Pending),
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(format!("unknown user status: {s}")),
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// User entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID).
    pub id: String,
    /// Email address, unique regardless of case.
    pub email: String,
    /// Login username (unique).
    pub username: String,
    /// Password hash (Argon2 PHC string).
    pub password_hash: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Lifecycle status.
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// When the email address was verified.
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Pre-generated user ID.
    pub id: String,
    /// Email address (already normalized).
    pub email: String,
    /// Login username.
    pub username: String,
    /// Password hash (must be pre-hashed).
    pub password_hash: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, status,
     email_verified, email_verified_at, last_login_at, created_at, updated_at";

/// Repository for user credentials.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user as part of a larger unit of work.
    ///
    /// The raw sqlx error is returned so callers can detect unique violations
    /// on `users.email` and `users.username`.
    pub async fn insert(
        conn: &mut SqliteConnection,
        new_user: &NewUser,
    ) -> std::result::Result<(), sqlx::Error> {
        let now = sql_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO users (id, email, username, password_hash, first_name, last_name,
                                status, email_verified, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?)",
        )
        .bind(&new_user.id)
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Resolve a login identifier, matching email first and username second.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        if let Some(user) = self.get_by_email(identifier).await? {
            return Ok(Some(user));
        }
        self.get_by_username(identifier).await
    }

    /// Check whether an email is already registered.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Check whether a username is already taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
                .bind(username)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Update the last login timestamp for a user.
    pub async fn update_last_login(&self, id: &str) -> Result<()> {
        let now = sql_timestamp(Utc::now());
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Change a user's status inside a transaction.
    ///
    /// Returns false if the user does not exist.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: &str,
        status: UserStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(sql_timestamp(Utc::now()))
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a user's email as verified inside a transaction.
    ///
    /// A `pending` account becomes `active`; other statuses are kept.
    pub async fn mark_email_verified(conn: &mut SqliteConnection, id: &str) -> Result<()> {
        let now = sql_timestamp(Utc::now());
        sqlx::query(
            "UPDATE users
             SET email_verified = 1,
                 email_verified_at = ?,
                 status = CASE WHEN status = 'pending' THEN 'active' ELSE status END,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
