//! Configuration module for Aegis.

use serde::Deserialize;
use std::path::Path;

use crate::auth::navigation::NavigationItem;
use crate::{AegisError, Result};

/// Minimum accepted length for the JWT signing secret.
pub const MIN_JWT_SECRET_LENGTH: usize = 16;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (`:memory:` for an in-memory store).
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/aegis.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/aegis.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_hash_memory")]
    pub memory_kib: u32,
    /// Time cost (iterations).
    #[serde(default = "default_hash_iterations")]
    pub iterations: u32,
    /// Degree of parallelism.
    #[serde(default = "default_hash_parallelism")]
    pub parallelism: u32,
}

fn default_hash_memory() -> u32 {
    19456
}

fn default_hash_iterations() -> u32 {
    2
}

fn default_hash_parallelism() -> u32 {
    1
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_hash_memory(),
            iterations: default_hash_iterations(),
            parallelism: default_hash_parallelism(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key (required).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh session lifetime in seconds.
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_secs: u64,
    /// Minimum password length accepted at registration.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Role assigned to newly registered users.
    #[serde(default = "default_role")]
    pub default_role: String,
    /// Password hashing cost.
    #[serde(default)]
    pub hashing: HashingConfig,
    /// Failed logins allowed per identifier inside the lockout window.
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// Lockout window (and lockout duration) in seconds.
    #[serde(default = "default_lockout_window")]
    pub lockout_window_secs: u64,
    /// Email verification token lifetime in hours.
    #[serde(default = "default_verification_expiry")]
    pub email_verification_expiry_hours: u64,
    /// Whether the refresh cookie carries the `Secure` attribute.
    #[serde(default)]
    pub cookie_secure: bool,
    /// Path attribute of the refresh cookie.
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
}

fn default_access_expiry() -> u64 {
    3600 // 1 hour
}

fn default_refresh_expiry() -> u64 {
    900 // 15 minutes
}

fn default_min_password_length() -> usize {
    8
}

fn default_role() -> String {
    "user".to_string()
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_lockout_window() -> u64 {
    900
}

fn default_verification_expiry() -> u64 {
    24
}

fn default_cookie_path() -> String {
    "/api/auth".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_expiry_secs: default_access_expiry(),
            refresh_token_expiry_secs: default_refresh_expiry(),
            min_password_length: default_min_password_length(),
            default_role: default_role(),
            hashing: HashingConfig::default(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_window_secs: default_lockout_window(),
            email_verification_expiry_hours: default_verification_expiry(),
            cookie_secure: false,
            cookie_path: default_cookie_path(),
        }
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Registrations per hour per client IP.
    #[serde(default = "default_register_per_hour")]
    pub register_per_hour: u32,
    /// Login attempts per minute per client IP and identifier.
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,
    /// Refresh attempts per minute per client IP.
    #[serde(default = "default_refresh_per_minute")]
    pub refresh_per_minute: u32,
    /// General API requests per minute per client IP.
    #[serde(default = "default_api_per_minute")]
    pub api_per_minute: u32,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_register_per_hour() -> u32 {
    3
}

fn default_login_per_minute() -> u32 {
    5
}

fn default_refresh_per_minute() -> u32 {
    10
}

fn default_api_per_minute() -> u32 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            register_per_hour: default_register_per_hour(),
            login_per_minute: default_login_per_minute(),
            refresh_per_minute: default_refresh_per_minute(),
            api_per_minute: default_api_per_minute(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Rate limit configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Navigation tree served to authorized callers.
    #[serde(default)]
    pub navigation: Vec<NavigationItem>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(AegisError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AegisError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `AEGIS_JWT_SECRET`: Override the JWT secret key
    /// - `AEGIS_DATABASE_PATH`: Override the database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("AEGIS_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
        if let Ok(path) = std::env::var("AEGIS_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AegisError::Config(format!(
                "jwt_secret must be at least {MIN_JWT_SECRET_LENGTH} characters. \
                 Set it in config.toml or via AEGIS_JWT_SECRET environment variable."
            )));
        }
        if self.auth.access_token_expiry_secs == 0 {
            return Err(AegisError::Config(
                "access_token_expiry_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.refresh_token_expiry_secs == 0 {
            return Err(AegisError::Config(
                "refresh_token_expiry_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
