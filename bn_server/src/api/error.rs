//! JSON error responses.

use axum::{Json, http::StatusCode};
use brain_notes::{
    auth::{AuthError, ErrorKind},
    notes::NoteError,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map an account error to its status and a client-safe message
pub fn auth_error(err: AuthError) -> ApiError {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        tracing::error!("Account operation failed: {}", err);
    }
    api_error(status_for(kind), err.client_message())
}

pub fn note_error(err: NoteError) -> ApiError {
    let status = match &err {
        NoteError::Database(e) => {
            tracing::error!("Notes operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        NoteError::NoteNotFound | NoteError::FolderNotFound => StatusCode::NOT_FOUND,
        NoteError::Validation(_) => StatusCode::BAD_REQUEST,
    };
    api_error(status, err.client_message())
}
