//! Input validation for registration.
//!
//! Checks run in a fixed order (email, username, password, first name,
//! last name) and the first offending field is reported.

use thiserror::Error;
use validator::ValidateEmail;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of first and last names.
pub const MAX_NAME_LENGTH: usize = 100;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains whitespace.
    #[error("username cannot contain whitespace")]
    UsernameInvalidChars,

    /// Password is too short.
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    /// First name is empty.
    #[error("first name is required")]
    FirstNameEmpty,

    /// Last name is empty.
    #[error("last name is required")]
    LastNameEmpty,

    /// A name is too long.
    #[error("{0} must be at most {MAX_NAME_LENGTH} characters")]
    NameTooLong(&'static str),

    /// A required field is empty.
    #[error("{0} is required")]
    Required(&'static str),
}

impl ValidationError {
    /// Request field the error refers to, as named in JSON bodies.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmailInvalidFormat | ValidationError::EmailTooLong => "email",
            ValidationError::UsernameTooShort
            | ValidationError::UsernameTooLong
            | ValidationError::UsernameInvalidChars => "username",
            ValidationError::PasswordTooShort(_) | ValidationError::PasswordTooLong => "password",
            ValidationError::FirstNameEmpty => "firstName",
            ValidationError::LastNameEmpty => "lastName",
            ValidationError::NameTooLong(field) | ValidationError::Required(field) => field,
        }
    }
}

/// Registration input after deserialization.
#[derive(Debug, Clone)]
pub struct RegistrationInput {
    /// Email address.
    pub email: String,
    /// Username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if !email.validate_email() {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(())
}

/// Validate a username.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Validate a password against the configured minimum length.
pub fn validate_password(password: &str, min_length: usize) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < min_length {
        return Err(ValidationError::PasswordTooShort(min_length));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

fn validate_name(
    value: &str,
    empty: ValidationError,
    field: &'static str,
) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong(field));
    }
    Ok(())
}

/// Validate a full registration request.
pub fn validate_registration(
    input: &RegistrationInput,
    min_password_length: usize,
) -> Result<(), ValidationError> {
    validate_email(input.email.trim())?;
    validate_username(&input.username)?;
    validate_password(&input.password, min_password_length)?;
    validate_name(&input.first_name, ValidationError::FirstNameEmpty, "firstName")?;
    validate_name(&input.last_name, ValidationError::LastNameEmpty, "lastName")?;
    Ok(())
}
