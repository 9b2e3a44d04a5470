//! Rate limiting middleware.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

use super::client::client_ip;
use crate::config::RateLimitConfig;
use crate::web::dto::LoginRequest;
use crate::web::error::ApiError;

/// Keyed rate limiter using Governor.
pub type KeyedRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Largest login body inspected for the identifier.
const MAX_LOGIN_BODY_BYTES: usize = 16 * 1024;

/// Clients without a resolvable address share this key.
const UNKNOWN_CLIENT: &str = "unknown";

/// State for rate limiting.
pub struct RateLimitState {
    /// Registrations per IP.
    register: KeyedRateLimiter,
    /// Logins per IP and identifier.
    login: KeyedRateLimiter,
    /// Refreshes per IP.
    refresh: KeyedRateLimiter,
    /// General API calls per IP.
    api: KeyedRateLimiter,
}

fn quota(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

impl RateLimitState {
    /// Create a new rate limit state.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            register: RateLimiter::keyed(Quota::per_hour(quota(config.register_per_hour))),
            login: RateLimiter::keyed(Quota::per_minute(quota(config.login_per_minute))),
            refresh: RateLimiter::keyed(Quota::per_minute(quota(config.refresh_per_minute))),
            api: RateLimiter::keyed(Quota::per_minute(quota(config.api_per_minute))),
        }
    }

    /// Check if a registration from `ip` is allowed.
    pub fn check_register(&self, ip: &str) -> bool {
        self.register.check_key(&ip.to_string()).is_ok()
    }

    /// Check if a login for `identifier` from `ip` is allowed.
    pub fn check_login(&self, ip: &str, identifier: &str) -> bool {
        let key = format!("{ip}|{}", identifier.trim().to_lowercase());
        self.login.check_key(&key).is_ok()
    }

    /// Check if a refresh from `ip` is allowed.
    pub fn check_refresh(&self, ip: &str) -> bool {
        self.refresh.check_key(&ip.to_string()).is_ok()
    }

    /// Check if a general API request from `ip` is allowed.
    pub fn check_api(&self, ip: &str) -> bool {
        self.api.check_key(&ip.to_string()).is_ok()
    }

    /// Drop keys whose quota has fully replenished.
    pub fn cleanup(&self) {
        self.register.retain_recent();
        self.login.retain_recent();
        self.refresh.retain_recent();
        self.api.retain_recent();
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

fn request_ip(req: &Request) -> String {
    client_ip(req.headers(), req.extensions()).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Rate limiting middleware for registration.
pub async fn register_rate_limit(
    State(state): State<Arc<RateLimitState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = request_ip(&req);
    if !state.check_register(&ip) {
        tracing::warn!(ip = %ip, "Registration rate limit exceeded");
        return ApiError::rate_limited().into_response();
    }
    next.run(req).await
}

/// Rate limiting middleware for login, keyed by IP and identifier.
///
/// The body is buffered to read the identifier and handed on unchanged.
pub async fn login_rate_limit(
    State(state): State<Arc<RateLimitState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = request_ip(&req);
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_LOGIN_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return ApiError::bad_request("request body too large").into_response(),
    };

    let identifier = serde_json::from_slice::<LoginRequest>(&bytes)
        .map(|login| login.identifier().to_string())
        .unwrap_or_default();
    if !state.check_login(&ip, &identifier) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::rate_limited().into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Rate limiting middleware for token refresh.
pub async fn refresh_rate_limit(
    State(state): State<Arc<RateLimitState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = request_ip(&req);
    if !state.check_refresh(&ip) {
        tracing::warn!(ip = %ip, "Refresh rate limit exceeded");
        return ApiError::rate_limited().into_response();
    }
    next.run(req).await
}

/// Rate limiting middleware for general API.
pub async fn api_rate_limit(
    State(state): State<Arc<RateLimitState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = request_ip(&req);
    if !state.check_api(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return ApiError::rate_limited().into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            register_per_hour: 3,
            login_per_minute: 5,
            refresh_per_minute: 10,
            api_per_minute: 3,
        }
    }

    #[test]
    fn test_register_rate_limit() {
        let state = RateLimitState::new(&config());

        assert!(state.check_register("127.0.0.1"));
        assert!(state.check_register("127.0.0.1"));
        assert!(state.check_register("127.0.0.1"));
        assert!(!state.check_register("127.0.0.1"));

        // Different IP should work
        assert!(state.check_register("192.168.1.1"));
    }

    #[test]
    fn test_login_keyed_by_identifier() {
        let state = RateLimitState::new(&config());

        for _ in 0..5 {
            assert!(state.check_login("127.0.0.1", "ada@example.com"));
        }
        assert!(!state.check_login("127.0.0.1", "ADA@example.com "));
        assert!(state.check_login("127.0.0.1", "grace@example.com"));
        assert!(state.check_login("10.0.0.1", "ada@example.com"));
    }

    #[test]
    fn test_api_rate_limit() {
        let state = RateLimitState::new(&config());

        assert!(state.check_api("127.0.0.1"));
        assert!(state.check_api("127.0.0.1"));
        assert!(state.check_api("127.0.0.1"));
        assert!(!state.check_api("127.0.0.1"));

        // Refresh has its own budget.
        assert!(state.check_refresh("127.0.0.1"));
    }

    #[test]
    fn test_zero_quota_clamped() {
        let state = RateLimitState::new(&RateLimitConfig {
            api_per_minute: 0,
            ..config()
        });
        assert!(state.check_api("127.0.0.1"));
        assert!(!state.check_api("127.0.0.1"));
    }
}
