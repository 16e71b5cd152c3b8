//! Integration tests for notes and folders.

use brain_notes::db::{Database, DatabaseConfig, MemoryStore};
use brain_notes::notes::{
    FolderPatch, NewFolder, NewNote, NoteError, NoteManager, NotePatch, PgNoteRepository,
};
use std::sync::Arc;

fn manager() -> NoteManager {
    NoteManager::new(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_users_cannot_see_each_others_notes() {
    let notes = manager();
    let folder = notes
        .create_folder(
            1,
            NewFolder {
                title: Some("Work".to_string()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    let note = notes
        .create_note(
            1,
            NewNote {
                title: Some("Plan".to_string()),
                body: "Ship it".to_string(),
                folder_id: Some(folder.id),
            },
        )
        .await
        .unwrap();

    let theirs = notes.tree(2).await.unwrap();
    assert!(theirs.folders.is_empty());
    assert!(theirs.notes.is_empty());

    assert!(matches!(
        notes.delete_folder(2, folder.id).await,
        Err(NoteError::FolderNotFound)
    ));
    assert!(matches!(
        notes
            .update_note(
                2,
                note.id,
                NotePatch {
                    body: Some("mine now".to_string()),
                    ..Default::default()
                }
            )
            .await,
        Err(NoteError::NoteNotFound)
    ));

    let mine = notes.tree(1).await.unwrap();
    assert_eq!(mine.folders[0].notes[0].content, "Ship it");
}

#[tokio::test]
async fn test_move_note_and_folder() {
    let notes = manager();
    let a = notes
        .create_folder(
            1,
            NewFolder {
                title: Some("A".to_string()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    let b = notes
        .create_folder(
            1,
            NewFolder {
                title: Some("B".to_string()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    let note = notes
        .create_note(
            1,
            NewNote {
                title: None,
                body: "floating".to_string(),
                folder_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(note.title, "floating");

    let moved = notes
        .update_note(
            1,
            note.id,
            NotePatch {
                folder_id: Some(a.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.folder_id, Some(a.id));
    assert_eq!(moved.content, "floating");

    let nested = notes
        .update_folder(
            1,
            a.id,
            FolderPatch {
                title: Some("A renamed".to_string()),
                parent_id: Some(b.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(nested.parent_id, Some(b.id));

    let tree = notes.tree(1).await.unwrap();
    assert_eq!(tree.folders.len(), 1);
    let child = &tree.folders[0].children[0];
    assert_eq!(child.folder.title.as_deref(), Some("A renamed"));
    assert_eq!(child.notes.len(), 1);

    notes.delete_note(1, note.id).await.unwrap();
    assert!(matches!(
        notes.delete_note(1, note.id).await,
        Err(NoteError::NoteNotFound)
    ));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_pg_folder_delete_cascades() {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/brain_notes_test".to_string());
    let db = Database::new(&DatabaseConfig::with_url(database_url))
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to migrate");

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email, full_name, hashed_password) \
         VALUES ($1, $2, 'Notes', 'hash') RETURNING id",
    )
    .bind(format!("n_{}", &suffix[..12]))
    .bind(format!("n_{}@example.com", &suffix[..12]))
    .fetch_one(db.pool())
    .await
    .unwrap();

    let notes = NoteManager::new(Arc::new(PgNoteRepository::new(db.pool().clone())));
    let root = notes
        .create_folder(
            user_id,
            NewFolder {
                title: Some("root".to_string()),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    let child = notes
        .create_folder(
            user_id,
            NewFolder {
                title: Some("child".to_string()),
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();
    notes
        .create_note(
            user_id,
            NewNote {
                title: None,
                body: "inside".to_string(),
                folder_id: Some(child.id),
            },
        )
        .await
        .unwrap();

    notes.delete_folder(user_id, root.id).await.unwrap();
    let tree = notes.tree(user_id).await.unwrap();
    assert!(tree.folders.is_empty());
    assert!(tree.notes.is_empty());

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db.pool())
        .await
        .unwrap();
    db.close().await;
}
