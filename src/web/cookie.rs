//! Refresh token cookie.

use chrono::{DateTime, Utc};

use crate::config::AuthConfig;

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Attributes of the refresh token cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Cookie path.
    pub path: String,
    /// Whether to mark the cookie `Secure`.
    pub secure: bool,
}

impl CookieSettings {
    /// Settings from the auth configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            path: config.cookie_path.clone(),
            secure: config.cookie_secure,
        }
    }

    /// `Set-Cookie` value carrying `token` until `expires_at`.
    pub fn refresh_cookie(&self, token: &str, expires_at: DateTime<Utc>) -> String {
        let max_age = (expires_at - Utc::now()).num_seconds().max(0);
        self.render(token, max_age)
    }

    /// `Set-Cookie` value that removes the cookie.
    pub fn clear_cookie(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{REFRESH_COOKIE}={value}; HttpOnly; SameSite=Strict; Path={}; Max-Age={max_age}",
            self.path
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
