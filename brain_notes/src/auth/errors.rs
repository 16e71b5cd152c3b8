//! Authentication error types.

use thiserror::Error;

use super::{session_token::TokenType, signed_token::SignedTokenError};

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Unknown username or wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Username already exists
    #[error("Username already exists")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Invalid username format
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid email format
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Invalid full name
    #[error("Invalid full name: {0}")]
    InvalidFullName(String),

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Request is well-formed but makes no sense
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Configured session lifetime puts the expiry outside the calendar
    #[error("Token lifetime out of range")]
    LifetimeOutOfRange,

    /// JWT encoding error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Session token missing, malformed, badly signed or expired
    #[error("Could not validate credentials")]
    InvalidToken,

    /// Session token decoded but its subject no longer exists
    #[error("Could not validate credentials")]
    Unauthorized,

    /// A session token of the other type was presented
    #[error("Wrong token type, expected {expected} token")]
    WrongTokenType { expected: TokenType },

    /// Account disabled by an administrator
    #[error("Inactive user")]
    AccountDisabled,

    /// Email address not confirmed yet
    #[error("Email not verified")]
    EmailNotVerified,

    /// Verification requested for an already verified account
    #[error("Email already verified")]
    AlreadyVerified,

    /// Verification, reset or email-change link rejected
    #[error(transparent)]
    Link(#[from] SignedTokenError),
}

/// Coarse classification of an [`AuthError`], used to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl AuthError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Database(_)
            | AuthError::HashingFailed
            | AuthError::LifetimeOutOfRange
            | AuthError::JwtError(_) => ErrorKind::Internal,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Unauthorized => {
                ErrorKind::Unauthorized
            }
            AuthError::WrongTokenType { .. }
            | AuthError::AccountDisabled
            | AuthError::EmailNotVerified => ErrorKind::Forbidden,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::UsernameTaken | AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::InvalidUsername(_)
            | AuthError::InvalidEmail(_)
            | AuthError::InvalidFullName(_)
            | AuthError::WeakPassword(_)
            | AuthError::Validation(_)
            | AuthError::AlreadyVerified
            | AuthError::Link(_) => ErrorKind::Validation,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize database errors - don't expose SQL details
            AuthError::Database(_) => "Internal server error".to_string(),
            // Sanitize JWT errors - don't expose token structure
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
