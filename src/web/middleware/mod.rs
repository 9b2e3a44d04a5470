//! Middleware for Web API.

pub mod auth;
pub mod client;
pub mod cors;
pub mod rate_limit;
pub mod security;

pub use auth::{
    inject_token_issuer, parse_bearer, require_permission, AuthUser, ClientInfo,
    GrantedPermissions, PermissionGuard,
};
pub use client::client_ip;
pub use cors::create_cors_layer;
pub use rate_limit::RateLimitState;
pub use security::security_headers;
