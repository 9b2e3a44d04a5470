//! Authentication and authorization failure taxonomy.

use thiserror::Error;

use super::password::PasswordError;
use super::validation::ValidationError;
use crate::AegisError;

/// Expected, user-facing failures of the authentication core.
///
/// Infrastructure failures travel inside [`AuthError::Internal`] and are
/// never reported to callers as one of the other kinds.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Email already registered.
    #[error("email is already registered")]
    DuplicateEmail,

    /// Username already taken.
    #[error("username is already taken")]
    DuplicateUsername,

    /// Unknown identifier or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Credentials are valid but the account is inactive or suspended.
    #[error("account is disabled")]
    AccountDisabled,

    /// Too many failed logins for this identifier.
    #[error("account is temporarily locked; try again in {minutes} minute(s)")]
    AccountLocked {
        /// Minutes until the lockout lifts, rounded up.
        minutes: i64,
    },

    /// Access token is malformed or its signature does not verify.
    #[error("invalid access token")]
    InvalidToken,

    /// Access token has expired.
    #[error("access token has expired")]
    TokenExpired,

    /// Refresh token is unknown or already used.
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh token has expired.
    #[error("refresh token has expired")]
    RefreshTokenExpired,

    /// No credential was presented.
    #[error("authentication required")]
    Unauthorized,

    /// Authenticated but missing the required permission.
    #[error("missing permission {0}")]
    Forbidden(String),

    /// Email verification token is unknown.
    #[error("invalid verification token")]
    InvalidVerificationToken,

    /// Email verification token has expired.
    #[error("verification token has expired")]
    VerificationTokenExpired,

    /// Email address is already verified.
    #[error("email is already verified")]
    EmailAlreadyVerified,

    /// A referenced user or role does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Role name already exists.
    #[error("role already exists")]
    DuplicateRole,

    /// Infrastructure failure.
    #[error("internal error")]
    Internal(#[source] AegisError),
}

impl AuthError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::DuplicateEmail => "EMAIL_ALREADY_EXISTS",
            AuthError::DuplicateUsername => "USERNAME_ALREADY_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountDisabled => "ACCOUNT_DISABLED",
            AuthError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::InvalidVerificationToken => "INVALID_VERIFICATION_TOKEN",
            AuthError::VerificationTokenExpired => "VERIFICATION_TOKEN_EXPIRED",
            AuthError::EmailAlreadyVerified => "EMAIL_ALREADY_VERIFIED",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::DuplicateRole => "ROLE_ALREADY_EXISTS",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Field the error refers to, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AuthError::Validation(e) => Some(e.field()),
            AuthError::DuplicateEmail => Some("email"),
            AuthError::DuplicateUsername => Some("username"),
            _ => None,
        }
    }
}

impl From<AegisError> for AuthError {
    fn from(err: AegisError) -> Self {
        AuthError::Internal(err)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(err.into())
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::VerificationFailed => AuthError::InvalidCredentials,
            other => AuthError::Internal(AegisError::Task(other.to_string())),
        }
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;
