//! Authentication and authorization core.
//!
//! This module provides password hashing, access token issuing, refresh
//! rotation, login lockout, role-based authorization and navigation
//! filtering.

mod authorization;
mod error;
mod lockout;
pub mod navigation;
mod password;
mod permission;
mod refresh;
mod service;
mod token;
pub mod validation;

pub use authorization::{AuthorizationEngine, RoleDetails};
pub use error::{AuthError, AuthResult};
pub use lockout::{LimitResult, LoginLimiter};
pub use navigation::{filter_navigation, NavigationItem};
pub use password::{PasswordError, PasswordHasher};
pub use permission::{Permission, PermissionParseError, PermissionSet};
pub use refresh::{generate_refresh_token, hash_refresh_token};
pub use service::{
    AuthOutcome, AuthService, AuthTokens, SessionMetadata, VerificationNotifier,
    VerificationOutcome,
};
pub use token::{AccessClaims, IssuedToken, TokenIssuer};
pub use validation::{RegistrationInput, ValidationError};
