//! Per-user notes organized in nested folders.

pub mod errors;
pub mod manager;
pub mod models;
pub mod repository;

pub use errors::{NoteError, NoteResult};
pub use manager::NoteManager;
pub use models::{
    Folder, FolderNode, FolderPatch, MAX_TITLE_LEN, NewFolder, NewNote, Note, NotePatch, NoteTree,
};
pub use repository::{NoteRepository, PgNoteRepository};
