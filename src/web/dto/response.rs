//! Response DTOs for Web API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::auth::{AuthOutcome, AuthTokens, RoleDetails};
use crate::db::{Session, User, UserStatus};

// ============================================================================
// Envelope
// ============================================================================

/// Metadata attached to every response.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    /// Response time, RFC 3339.
    pub timestamp: String,
    /// Service version.
    pub version: &'static str,
}

impl Meta {
    /// Metadata for a response produced now.
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always true.
    pub success: bool,
    /// Response data.
    pub data: T,
    /// Response metadata.
    pub meta: Meta,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: Meta::now(),
        }
    }
}

/// Empty payload, rendered as `{}`.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

/// Plain message payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    /// Create a message payload.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Auth DTOs
// ============================================================================

/// User information in responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// User ID.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Username.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Account status.
    pub status: UserStatus,
    /// Whether the email address is confirmed.
    pub email_verified: bool,
    /// When the email address was confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Last successful login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            status: user.status,
            email_verified: user.email_verified,
            email_verified_at: user.email_verified_at,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Register and login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Authenticated user.
    pub user: UserInfo,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl From<&AuthOutcome> for AuthResponse {
    fn from(outcome: &AuthOutcome) -> Self {
        Self {
            user: UserInfo::from(&outcome.user),
            access_token: outcome.tokens.access_token.clone(),
            refresh_token: outcome.tokens.refresh_token.clone(),
            expires_in: outcome.tokens.expires_in,
        }
    }
}

/// Token refresh response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token.
    pub access_token: String,
    /// New refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl From<&AuthTokens> for RefreshResponse {
    fn from(tokens: &AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_in: tokens.expires_in,
        }
    }
}

/// Caller's roles and effective permissions.
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    /// Role names.
    pub roles: Vec<String>,
    /// `resource.action` strings, sorted.
    pub permissions: Vec<String>,
}

/// An active session, without token material.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session ID.
    pub id: String,
    /// User-Agent recorded at creation.
    pub user_agent: Option<String>,
    /// Client IP recorded at creation.
    pub ip_address: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            user_agent: session.user_agent.clone(),
            ip_address: session.ip_address.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Email verification response.
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    /// Outcome message.
    pub message: String,
    /// Verified user.
    pub user: UserInfo,
}

/// Lockout clearing response.
#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    /// Identifier that was unlocked.
    pub identifier: String,
    /// Number of failures removed.
    pub cleared: u64,
}

// ============================================================================
// RBAC DTOs
// ============================================================================

/// Role response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    /// Role ID.
    pub id: String,
    /// Role name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Granted permissions.
    pub permissions: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&RoleDetails> for RoleResponse {
    fn from(details: &RoleDetails) -> Self {
        Self {
            id: details.role.id.clone(),
            name: details.role.name.clone(),
            description: details.role.description.clone(),
            permissions: details.permissions.to_strings(),
            created_at: details.role.created_at,
        }
    }
}

/// Role assignment change response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentResponse {
    /// Target user.
    pub user_id: String,
    /// Role name.
    pub role: String,
    /// Whether the assignment changed.
    pub changed: bool,
}
