//! In-process store used by the test suites.
//!
//! Honors the same contracts as the PostgreSQL repositories: unique
//! usernames and emails, owner-scoped note access and cascading folder
//! deletes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::repository::UserRepository;
use crate::auth::{AuthError, AuthResult, NewUser, User, UserId, UserPatch};
use crate::notes::{Folder, FolderPatch, Note, NotePatch, NoteRepository, NoteResult};

#[derive(Default)]
struct Users {
    next_id: UserId,
    rows: HashMap<UserId, User>,
}

#[derive(Default)]
struct Notes {
    folders: HashMap<Uuid, Folder>,
    notes: HashMap<Uuid, Note>,
}

/// In-memory implementation of `UserRepository` and `NoteRepository`
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Users>,
    notes: Mutex<Notes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn user_count(&self) -> usize {
        self.users().rows.len()
    }

    fn users(&self) -> MutexGuard<'_, Users> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notes(&self) -> MutexGuard<'_, Notes> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let users = self.users();
        Ok(users.rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users();
        Ok(users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(self.users().rows.get(&user_id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> AuthResult<User> {
        let mut users = self.users();
        if users.rows.values().any(|u| u.username == user.username) {
            return Err(AuthError::UsernameTaken);
        }
        if users.rows.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }

        users.next_id += 1;
        let row = User {
            id: users.next_id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            hashed_password: user.hashed_password,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_user(&self, user_id: UserId, patch: UserPatch) -> AuthResult<bool> {
        let mut users = self.users();
        if let Some(email) = &patch.email {
            if users
                .rows
                .values()
                .any(|u| u.id != user_id && &u.email == email)
            {
                return Err(AuthError::EmailTaken);
            }
        }

        let Some(user) = users.rows.get_mut(&user_id) else {
            return Ok(false);
        };
        if patch.is_empty() {
            return Ok(true);
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(hashed_password) = patch.hashed_password {
            user.hashed_password = hashed_password;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        if let Some(is_verified) = patch.is_verified {
            user.is_verified = is_verified;
        }
        user.updated_at = Some(Utc::now());
        Ok(true)
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn insert_note(
        &self,
        user_id: UserId,
        title: &str,
        content: &str,
        folder_id: Option<Uuid>,
    ) -> NoteResult<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            user_id,
            folder_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notes().notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note(
        &self,
        user_id: UserId,
        note_id: Uuid,
        patch: NotePatch,
    ) -> NoteResult<Option<Note>> {
        let mut store = self.notes();
        let Some(note) = store
            .notes
            .get_mut(&note_id)
            .filter(|n| n.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(body) = patch.body {
            note.content = body;
        }
        if let Some(folder_id) = patch.folder_id {
            note.folder_id = Some(folder_id);
        }
        note.updated_at = Some(Utc::now());
        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, user_id: UserId, note_id: Uuid) -> NoteResult<bool> {
        let mut store = self.notes();
        match store.notes.get(&note_id) {
            Some(note) if note.user_id == user_id => {
                store.notes.remove(&note_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_notes(&self, user_id: UserId) -> NoteResult<Vec<Note>> {
        let store = self.notes();
        let mut notes: Vec<Note> = store
            .notes
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by_key(|n| (n.created_at, n.id));
        Ok(notes)
    }

    async fn insert_folder(
        &self,
        user_id: UserId,
        title: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> NoteResult<Folder> {
        let folder = Folder {
            id: Uuid::new_v4(),
            title: title.map(str::to_string),
            parent_id,
            user_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notes().folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn update_folder(
        &self,
        user_id: UserId,
        folder_id: Uuid,
        patch: FolderPatch,
    ) -> NoteResult<Option<Folder>> {
        let mut store = self.notes();
        let Some(folder) = store
            .folders
            .get_mut(&folder_id)
            .filter(|f| f.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            folder.title = Some(title);
        }
        if let Some(parent_id) = patch.parent_id {
            folder.parent_id = Some(parent_id);
        }
        folder.updated_at = Some(Utc::now());
        Ok(Some(folder.clone()))
    }

    async fn delete_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<bool> {
        let mut store = self.notes();
        if !store
            .folders
            .get(&folder_id)
            .is_some_and(|f| f.user_id == user_id)
        {
            return Ok(false);
        }

        // Collect the subtree breadth-first, then drop it with its notes.
        let mut doomed = HashSet::from([folder_id]);
        let mut frontier = vec![folder_id];
        while let Some(parent) = frontier.pop() {
            for folder in store.folders.values() {
                if folder.parent_id == Some(parent) && doomed.insert(folder.id) {
                    frontier.push(folder.id);
                }
            }
        }

        store.folders.retain(|id, _| !doomed.contains(id));
        store
            .notes
            .retain(|_, n| !n.folder_id.is_some_and(|f| doomed.contains(&f)));
        Ok(true)
    }

    async fn find_folder(&self, user_id: UserId, folder_id: Uuid) -> NoteResult<Option<Folder>> {
        let store = self.notes();
        Ok(store
            .folders
            .get(&folder_id)
            .filter(|f| f.user_id == user_id)
            .cloned())
    }

    async fn list_folders(&self, user_id: UserId) -> NoteResult<Vec<Folder>> {
        let store = self.notes();
        let mut folders: Vec<Folder> = store
            .folders
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        folders.sort_by_key(|f| (f.created_at, f.id));
        Ok(folders)
    }
}
