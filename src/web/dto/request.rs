//! Request DTOs for Web API.

use serde::Deserialize;

use crate::auth::RegistrationInput;

/// User registration request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email address.
    pub email: String,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl From<RegisterRequest> for RegistrationInput {
    fn from(req: RegisterRequest) -> Self {
        RegistrationInput {
            email: req.email,
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

/// Login request.
///
/// `email` may hold a username; `username` is accepted as an alias.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Email or username.
    pub email: Option<String>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: String,
}

impl LoginRequest {
    /// The identifier to authenticate with.
    pub fn identifier(&self) -> &str {
        self.email
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.username.as_deref())
            .unwrap_or_default()
    }
}

/// Token refresh request, used when no cookie is sent.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: Option<String>,
}

/// Email verification request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyEmailRequest {
    /// Verification token.
    pub token: String,
}

/// Lockout clearing request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnlockRequest {
    /// Email or username.
    pub identifier: String,
}

/// Role creation request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRoleRequest {
    /// Role name.
    pub name: String,
    /// Description.
    pub description: String,
    /// `resource.action` strings.
    pub permissions: Vec<String>,
}

/// Role assignment request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssignRoleRequest {
    /// Role name.
    pub role: String,
}

/// User status change request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    /// New status.
    pub status: String,
}
