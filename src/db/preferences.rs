//! Per-user display preferences.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;

use super::{sql_timestamp, DbPool};
use crate::Result;

/// Display preferences of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserPreferences {
    /// Theme name.
    pub theme: String,
    /// Color scheme.
    pub scheme: String,
    /// Layout name.
    pub layout: String,
}

/// Repository for user preferences.
pub struct PreferencesRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PreferencesRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create the default preferences row for a new user.
    pub async fn create_default(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO user_preferences (user_id, updated_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(sql_timestamp(Utc::now()))
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Get a user's preferences.
    pub async fn get(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let prefs = sqlx::query_as::<_, UserPreferences>(
            "SELECT theme, scheme, layout FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(prefs)
    }
}
