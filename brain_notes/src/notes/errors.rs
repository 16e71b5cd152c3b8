//! Notes error types.

use thiserror::Error;

/// Notes and folders errors
#[derive(Debug, Error)]
pub enum NoteError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Note does not exist for this user
    #[error("Note not found")]
    NoteNotFound,

    /// Folder does not exist for this user
    #[error("Folder not found")]
    FolderNotFound,

    /// Invalid input
    #[error("Invalid request: {0}")]
    Validation(String),
}

impl NoteError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            NoteError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for notes operations
pub type NoteResult<T> = Result<T, NoteError>;
