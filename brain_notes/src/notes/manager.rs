//! Notes and folders manager.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::{
    errors::{NoteError, NoteResult},
    models::{
        Folder, FolderNode, FolderPatch, MAX_TITLE_LEN, NewFolder, NewNote, Note, NotePatch,
        NoteTree,
    },
    repository::NoteRepository,
};
use crate::auth::UserId;

/// Owner-scoped CRUD over a user's folders and notes
#[derive(Clone)]
pub struct NoteManager {
    repo: Arc<dyn NoteRepository>,
}

impl NoteManager {
    pub fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    /// Create a note. A missing title is taken from the start of the body.
    ///
    /// # Errors
    ///
    /// * `NoteError::Validation` - Empty body, long title, or a folder the user does not own
    pub async fn create_note(&self, user_id: UserId, note: NewNote) -> NoteResult<Note> {
        let body = note.body.trim();
        if body.is_empty() {
            return Err(NoteError::Validation("Note body cannot be empty".to_string()));
        }

        let title = match note.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => {
                check_title(title)?;
                title.to_string()
            }
            _ => default_title(body),
        };

        if let Some(folder_id) = note.folder_id {
            self.require_folder(user_id, folder_id).await?;
        }

        let created = self
            .repo
            .insert_note(user_id, &title, &note.body, note.folder_id)
            .await?;
        log::debug!("User {} created note {}", user_id, created.id);
        Ok(created)
    }

    pub async fn update_note(
        &self,
        user_id: UserId,
        note_id: Uuid,
        mut patch: NotePatch,
    ) -> NoteResult<Note> {
        // A blank title leaves the current one in place.
        patch.title = patch
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if let Some(title) = patch.title.as_deref() {
            check_title(title)?;
        }
        if let Some(body) = patch.body.as_deref() {
            if body.trim().is_empty() {
                return Err(NoteError::Validation("Note body cannot be empty".to_string()));
            }
        }
        if let Some(folder_id) = patch.folder_id {
            self.require_folder(user_id, folder_id).await?;
        }

        self.repo
            .update_note(user_id, note_id, patch)
            .await?
            .ok_or(NoteError::NoteNotFound)
    }

    pub async fn delete_note(&self, user_id: UserId, note_id: Uuid) -> NoteResult<()> {
        if self.repo.delete_note(user_id, note_id).await? {
            Ok(())
        } else {
            Err(NoteError::NoteNotFound)
        }
    }

    pub async fn create_folder(&self, user_id: UserId, folder: NewFolder) -> NoteResult<Folder> {
        let title = normalize_folder_title(folder.title)?;
        if let Some(parent_id) = folder.parent_id {
            self.require_folder(user_id, parent_id).await?;
        }

        let created = self
            .repo
            .insert_folder(user_id, title.as_deref(), folder.parent_id)
            .await?;
        log::debug!("User {} created folder {}", user_id, created.id);
        Ok(created)
    }

    /// Rename or move a folder
    ///
    /// # Errors
    ///
    /// * `NoteError::FolderNotFound` - No such folder for this user
    /// * `NoteError::Validation` - Long title, unknown parent, or a move under
    ///   the folder itself or one of its descendants
    pub async fn update_folder(
        &self,
        user_id: UserId,
        folder_id: Uuid,
        mut patch: FolderPatch,
    ) -> NoteResult<Folder> {
        patch.title = normalize_folder_title(patch.title)?;

        if let Some(parent_id) = patch.parent_id {
            let folders = self.repo.list_folders(user_id).await?;
            if !folders.iter().any(|f| f.id == folder_id) {
                return Err(NoteError::FolderNotFound);
            }
            if !folders.iter().any(|f| f.id == parent_id) {
                return Err(NoteError::Validation("Parent folder not found".to_string()));
            }
            if is_within(&folders, parent_id, folder_id) {
                return Err(NoteError::Validation(
                    "A folder cannot be moved into itself or one of its sub-folders".to_string(),
                ));
            }
        }

        self.repo
            .update_folder(user_id, folder_id, patch)
            .await?
            .ok_or(NoteError::FolderNotFound)
    }

    /// Delete a folder together with its sub-folders and their notes
    pub async fn delete_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<()> {
        if self.repo.delete_folder(user_id, folder_id).await? {
            Ok(())
        } else {
            Err(NoteError::FolderNotFound)
        }
    }

    /// Everything the user owns, root folders first
    pub async fn tree(&self, user_id: UserId) -> NoteResult<NoteTree> {
        let folders = self.repo.list_folders(user_id).await?;
        let notes = self.repo.list_notes(user_id).await?;
        Ok(build_tree(folders, notes))
    }

    async fn require_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<Folder> {
        self.repo
            .find_folder(user_id, folder_id)
            .await?
            .ok_or_else(|| NoteError::Validation("Folder not found".to_string()))
    }
}

fn check_title(title: &str) -> NoteResult<()> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(NoteError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn default_title(body: &str) -> String {
    body.chars().take(MAX_TITLE_LEN).collect()
}

/// Blank folder titles are stored as no title at all
fn normalize_folder_title(title: Option<String>) -> NoteResult<Option<String>> {
    match title.as_deref().map(str::trim) {
        Some("") | None => Ok(None),
        Some(title) => {
            check_title(title)?;
            Ok(Some(title.to_string()))
        }
    }
}

/// Whether `candidate` is `ancestor` or sits somewhere below it
fn is_within(folders: &[Folder], candidate: Uuid, ancestor: Uuid) -> bool {
    let parents: HashMap<Uuid, Option<Uuid>> =
        folders.iter().map(|f| (f.id, f.parent_id)).collect();

    let mut current = Some(candidate);
    let mut steps = 0;
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        steps += 1;
        if steps > folders.len() {
            break;
        }
        current = parents.get(&id).copied().flatten();
    }
    false
}

fn build_tree(folders: Vec<Folder>, notes: Vec<Note>) -> NoteTree {
    let mut notes_by_folder: HashMap<Option<Uuid>, Vec<Note>> = HashMap::new();
    for note in notes {
        notes_by_folder.entry(note.folder_id).or_default().push(note);
    }

    let mut children_by_parent: HashMap<Option<Uuid>, Vec<Folder>> = HashMap::new();
    for folder in folders {
        children_by_parent
            .entry(folder.parent_id)
            .or_default()
            .push(folder);
    }

    fn attach(
        parent: Option<Uuid>,
        children_by_parent: &mut HashMap<Option<Uuid>, Vec<Folder>>,
        notes_by_folder: &mut HashMap<Option<Uuid>, Vec<Note>>,
    ) -> Vec<FolderNode> {
        let folders = children_by_parent.remove(&parent).unwrap_or_default();
        folders
            .into_iter()
            .map(|folder| {
                let id = Some(folder.id);
                FolderNode {
                    notes: notes_by_folder.remove(&id).unwrap_or_default(),
                    children: attach(id, children_by_parent, notes_by_folder),
                    folder,
                }
            })
            .collect()
    }

    let folders = attach(None, &mut children_by_parent, &mut notes_by_folder);
    NoteTree {
        folders,
        notes: notes_by_folder.remove(&None).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn manager() -> NoteManager {
        NoteManager::new(Arc::new(MemoryStore::new()))
    }

    fn note(body: &str) -> NewNote {
        NewNote {
            body: body.to_string(),
            ..Default::default()
        }
    }

    fn folder(title: &str, parent_id: Option<Uuid>) -> NewFolder {
        NewFolder {
            title: Some(title.to_string()),
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_title_defaults_to_body_prefix() {
        let notes = manager();
        let body = "x".repeat(80);

        let created = notes.create_note(1, note(&body)).await.unwrap();
        assert_eq!(created.title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(created.content, body);
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let notes = manager();
        assert!(matches!(
            notes.create_note(1, note("   ")).await,
            Err(NoteError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_long_title_rejected() {
        let notes = manager();
        let request = NewNote {
            title: Some("t".repeat(51)),
            body: "body".to_string(),
            folder_id: None,
        };
        assert!(matches!(
            notes.create_note(1, request).await,
            Err(NoteError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_patch_title_keeps_current_title() {
        let notes = manager();
        let request = NewNote {
            title: Some("Groceries".to_string()),
            body: "eggs".to_string(),
            folder_id: None,
        };
        let created = notes.create_note(1, request).await.unwrap();

        let patch = NotePatch {
            title: Some("   ".to_string()),
            body: Some("eggs, milk".to_string()),
            folder_id: None,
        };
        let updated = notes.update_note(1, created.id, patch).await.unwrap();
        assert_eq!(updated.title, "Groceries");
        assert_eq!(updated.content, "eggs, milk");

        let patch = NotePatch {
            title: Some("  Shopping  ".to_string()),
            ..Default::default()
        };
        let renamed = notes.update_note(1, created.id, patch).await.unwrap();
        assert_eq!(renamed.title, "Shopping");
    }

    #[tokio::test]
    async fn test_notes_are_scoped_to_owner() {
        let notes = manager();
        let created = notes.create_note(1, note("mine")).await.unwrap();

        assert!(matches!(
            notes.delete_note(2, created.id).await,
            Err(NoteError::NoteNotFound)
        ));
        assert!(matches!(
            notes
                .update_note(2, created.id, NotePatch::default())
                .await,
            Err(NoteError::NoteNotFound)
        ));
        assert!(notes.tree(2).await.unwrap().notes.is_empty());
        assert_eq!(notes.tree(1).await.unwrap().notes.len(), 1);
    }

    #[tokio::test]
    async fn test_cannot_file_note_in_foreign_folder() {
        let notes = manager();
        let theirs = notes.create_folder(2, folder("theirs", None)).await.unwrap();

        let request = NewNote {
            title: None,
            body: "hello".to_string(),
            folder_id: Some(theirs.id),
        };
        assert!(matches!(
            notes.create_note(1, request).await,
            Err(NoteError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_tree_nests_folders_and_notes() {
        let notes = manager();
        let root = notes.create_folder(1, folder("root", None)).await.unwrap();
        let child = notes
            .create_folder(1, folder("child", Some(root.id)))
            .await
            .unwrap();
        notes
            .create_note(
                1,
                NewNote {
                    title: Some("deep".to_string()),
                    body: "in child".to_string(),
                    folder_id: Some(child.id),
                },
            )
            .await
            .unwrap();
        notes.create_note(1, note("loose")).await.unwrap();

        let tree = notes.tree(1).await.unwrap();
        assert_eq!(tree.folders.len(), 1);
        assert_eq!(tree.notes.len(), 1);
        assert_eq!(tree.folders[0].children.len(), 1);
        assert_eq!(tree.folders[0].children[0].notes[0].title, "deep");
    }

    #[tokio::test]
    async fn test_folder_cannot_move_under_descendant() {
        let notes = manager();
        let root = notes.create_folder(1, folder("root", None)).await.unwrap();
        let child = notes
            .create_folder(1, folder("child", Some(root.id)))
            .await
            .unwrap();

        let into_child = FolderPatch {
            title: None,
            parent_id: Some(child.id),
        };
        assert!(matches!(
            notes.update_folder(1, root.id, into_child).await,
            Err(NoteError::Validation(_))
        ));

        let into_self = FolderPatch {
            title: None,
            parent_id: Some(root.id),
        };
        assert!(matches!(
            notes.update_folder(1, root.id, into_self).await,
            Err(NoteError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_folder_removes_subtree() {
        let notes = manager();
        let root = notes.create_folder(1, folder("root", None)).await.unwrap();
        let child = notes
            .create_folder(1, folder("child", Some(root.id)))
            .await
            .unwrap();
        notes
            .create_note(
                1,
                NewNote {
                    title: None,
                    body: "gone".to_string(),
                    folder_id: Some(child.id),
                },
            )
            .await
            .unwrap();

        notes.delete_folder(1, root.id).await.unwrap();

        let tree = notes.tree(1).await.unwrap();
        assert!(tree.folders.is_empty());
        assert!(tree.notes.is_empty());
    }
}
