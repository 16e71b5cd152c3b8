//! Note and folder storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use super::{
    errors::NoteResult,
    models::{Folder, FolderPatch, Note, NotePatch},
};
use crate::auth::UserId;

const NOTE_COLUMNS: &str = "id, title, content, user_id, folder_id, created_at, updated_at";
const FOLDER_COLUMNS: &str = "id, title, parent_id, user_id, created_at, updated_at";

/// Trait for note/folder repository operations
///
/// Every call is scoped to `user_id`: rows owned by another user behave as
/// if they did not exist. Inputs are assumed validated by the caller.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn insert_note(
        &self,
        user_id: UserId,
        title: &str,
        content: &str,
        folder_id: Option<Uuid>,
    ) -> NoteResult<Note>;

    /// `None` when the note does not exist for this user
    async fn update_note(
        &self,
        user_id: UserId,
        note_id: Uuid,
        patch: NotePatch,
    ) -> NoteResult<Option<Note>>;

    async fn delete_note(&self, user_id: UserId, note_id: Uuid) -> NoteResult<bool>;

    async fn list_notes(&self, user_id: UserId) -> NoteResult<Vec<Note>>;

    async fn insert_folder(
        &self,
        user_id: UserId,
        title: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> NoteResult<Folder>;

    /// `None` when the folder does not exist for this user
    async fn update_folder(
        &self,
        user_id: UserId,
        folder_id: Uuid,
        patch: FolderPatch,
    ) -> NoteResult<Option<Folder>>;

    /// Removes the folder with its sub-folders and their notes
    async fn delete_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<bool>;

    async fn find_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<Option<Folder>>;

    async fn list_folders(&self, user_id: UserId) -> NoteResult<Vec<Folder>>;
}

/// PostgreSQL implementation of `NoteRepository`
///
/// Folder subtrees are removed by the `ON DELETE CASCADE` foreign keys.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert_note(
        &self,
        user_id: UserId,
        title: &str,
        content: &str,
        folder_id: Option<Uuid>,
    ) -> NoteResult<Note> {
        let sql = format!(
            "INSERT INTO notes (id, title, content, user_id, folder_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(content)
            .bind(user_id)
            .bind(folder_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(note_from_row(&row)?)
    }

    async fn update_note(
        &self,
        user_id: UserId,
        note_id: Uuid,
        patch: NotePatch,
    ) -> NoteResult<Option<Note>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE notes SET updated_at = NOW()");
        if let Some(title) = patch.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(body) = patch.body {
            query.push(", content = ").push_bind(body);
        }
        if let Some(folder_id) = patch.folder_id {
            query.push(", folder_id = ").push_bind(folder_id);
        }
        query
            .push(" WHERE id = ")
            .push_bind(note_id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(NOTE_COLUMNS);

        let row = query.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(note_from_row).transpose()?)
    }

    async fn delete_note(&self, user_id: UserId, note_id: Uuid) -> NoteResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_notes(&self, user_id: UserId) -> NoteResult<Vec<Note>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(note_from_row).collect::<Result<_, _>>()?)
    }

    async fn insert_folder(
        &self,
        user_id: UserId,
        title: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> NoteResult<Folder> {
        let sql = format!(
            "INSERT INTO folders (id, title, parent_id, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING {FOLDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(parent_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(folder_from_row(&row)?)
    }

    async fn update_folder(
        &self,
        user_id: UserId,
        folder_id: Uuid,
        patch: FolderPatch,
    ) -> NoteResult<Option<Folder>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE folders SET updated_at = NOW()");
        if let Some(title) = patch.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(parent_id) = patch.parent_id {
            query.push(", parent_id = ").push_bind(parent_id);
        }
        query
            .push(" WHERE id = ")
            .push_bind(folder_id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(FOLDER_COLUMNS);

        let row = query.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(folder_from_row).transpose()?)
    }

    async fn delete_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = $1 AND user_id = $2")
            .bind(folder_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(folder_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(folder_from_row).transpose()?)
    }

    async fn list_folders(&self, user_id: UserId) -> NoteResult<Vec<Folder>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(folder_from_row).collect::<Result<_, _>>()?)
    }
}

fn note_from_row(row: &PgRow) -> Result<Note, sqlx::Error> {
    Ok(Note {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        user_id: row.try_get("user_id")?,
        folder_id: row.try_get("folder_id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

fn folder_from_row(row: &PgRow) -> Result<Folder, sqlx::Error> {
    Ok(Folder {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        parent_id: row.try_get("parent_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}
