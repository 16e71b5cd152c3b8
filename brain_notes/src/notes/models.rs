//! Note and folder data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::UserId;

/// Maximum title length for notes and folders, in characters
pub const MAX_TITLE_LEN: usize = 50;

/// Folder model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub title: Option<String>,
    pub parent_id: Option<Uuid>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Note model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub user_id: UserId,
    pub folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Note creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
    pub title: Option<String>,
    pub body: String,
    pub folder_id: Option<Uuid>,
}

/// Partial note update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub folder_id: Option<Uuid>,
}

/// Folder creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFolder {
    pub title: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Partial folder update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderPatch {
    pub title: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// A folder with its notes and sub-folders
#[derive(Debug, Clone, Serialize)]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: Folder,
    pub notes: Vec<Note>,
    pub children: Vec<FolderNode>,
}

/// Everything a user owns, arranged as a tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteTree {
    pub folders: Vec<FolderNode>,
    pub notes: Vec<Note>,
}
