//! Aegis - authentication and authorization core
//!
//! Stateless access tokens, rotating refresh sessions and role-based access
//! control, served over an axum HTTP API backed by SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{
    AccessClaims, AuthError, AuthOutcome, AuthResult, AuthService, AuthTokens,
    AuthorizationEngine, NavigationItem, Permission, PermissionSet, SessionMetadata, TokenIssuer,
    VerificationNotifier,
};
pub use config::Config;
pub use db::{Database, Session, User, UserStatus};
pub use error::{AegisError, Result};
pub use web::WebServer;
