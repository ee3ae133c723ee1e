//! Application error types for bookwarden
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Authentication and authorization errors
///
/// Every authentication variant is surfaced to the caller as the same
/// undifferentiated 401 response; the distinction only exists internally
/// for logging. `Forbidden` is the sole variant that maps to 403.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// No session cookie was presented
    #[error("No credential presented")]
    MissingCredential,

    /// Token failed signature verification or was structurally malformed
    #[error("Invalid token")]
    InvalidToken,

    /// Token declared a signing algorithm other than the configured one
    #[error("Unexpected signing algorithm")]
    AlgorithmMismatch,

    /// Token expired
    #[error("Token expired")]
    TokenExpired,

    /// Subject claim absent or empty
    #[error("Invalid subject claim")]
    InvalidSubject,

    /// Subject does not resolve to a known principal
    #[error("Unknown principal")]
    UnknownPrincipal,

    /// Principal is known but lacks the required role
    #[error("Insufficient privileges")]
    Forbidden,

    /// Token could not be issued
    #[error("Failed to issue token: {0}")]
    Issuance(String),
}

impl AuthError {
    /// True for every variant that must surface as 401 Unauthorized.
    ///
    /// The sub-cases are deliberately conflated at the response level so a
    /// caller probing credentials learns nothing about which check failed.
    pub fn is_unauthenticated(&self) -> bool {
        !matches!(self, AuthError::Forbidden)
    }
}

/// Password hashing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PasswordError {
    /// Hashing failed
    #[error("Password hashing failed: {0}")]
    HashFailed(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

/// Application-level error type
///
/// Aggregates the domain-specific error types for the `main` boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Password hashing error
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
