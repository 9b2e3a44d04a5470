//! Error types for Aegis.

use thiserror::Error;

/// Infrastructure error type for Aegis.
///
/// These are never part of the authentication taxonomy. They surface to HTTP
/// callers only as a generic internal error.
#[derive(Error, Debug)]
pub enum AegisError {
    /// Database error.
    ///
    /// Wraps errors from the sqlx SQLite backend.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),
}

impl From<sqlx::Error> for AegisError {
    fn from(e: sqlx::Error) -> Self {
        AegisError::Database(e.to_string())
    }
}

/// Result type alias for Aegis infrastructure operations.
pub type Result<T> = std::result::Result<T, AegisError>;
