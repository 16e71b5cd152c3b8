//! Note and folder handlers. Every operation is scoped to the signed-in user.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use brain_notes::notes::{
    Folder, FolderPatch, NewFolder, NewNote, Note, NotePatch, NoteTree,
};
use uuid::Uuid;

use super::{
    AppState,
    error::{ApiError, note_error},
    middleware::CurrentUser,
};

/// All folders and notes of the user, nested
pub async fn tree(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<NoteTree>, ApiError> {
    let tree = state.notes.tree(user.id).await.map_err(note_error)?;
    Ok(Json(tree))
}

/// Create a note; the title defaults to the start of the body
pub async fn create_note(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(note): Json<NewNote>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state
        .notes
        .create_note(user.id, note)
        .await
        .map_err(note_error)?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(note_id): Path<Uuid>,
    Json(patch): Json<NotePatch>,
) -> Result<Json<Note>, ApiError> {
    let note = state
        .notes
        .update_note(user.id, note_id, patch)
        .await
        .map_err(note_error)?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(note_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .notes
        .delete_note(user.id, note_id)
        .await
        .map_err(note_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_folder(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(folder): Json<NewFolder>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let folder = state
        .notes
        .create_folder(user.id, folder)
        .await
        .map_err(note_error)?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// Rename a folder or move it under another one
pub async fn update_folder(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(folder_id): Path<Uuid>,
    Json(patch): Json<FolderPatch>,
) -> Result<Json<Folder>, ApiError> {
    let folder = state
        .notes
        .update_folder(user.id, folder_id, patch)
        .await
        .map_err(note_error)?;
    Ok(Json(folder))
}

/// Delete a folder together with its sub-folders and their notes
pub async fn delete_folder(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(folder_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .notes
        .delete_folder(user.id, folder_id)
        .await
        .map_err(note_error)?;
    Ok(StatusCode::NO_CONTENT)
}
