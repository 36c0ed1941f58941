//! High-level `NoteStore` API over the pool and repositories.
//!
//! Constructed once by the server process and injected into the dispatcher —
//! there is no ambient global handle. Methods are synchronous; SQLite work
//! is short and per-operation atomic.

use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::sqlite::connection::{ConnectionPool, PooledConnection, open_pool};
use crate::sqlite::repositories::note::{CreateNoteOptions, NotePatch, NoteRepo};
use crate::sqlite::repositories::user::UserRepo;
use crate::sqlite::row_types::{NoteRow, UserRow};

/// Storage collaborator: users and notes behind a connection pool.
pub struct NoteStore {
    pool: ConnectionPool,
}

impl NoteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_pool(path)?;
        debug!(path = %path.display(), "note store opened");
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Look up an account by email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        UserRepo::find_by_email(&*self.conn()?, email)
    }

    /// Create an account; duplicate email fails.
    pub fn create_user(&self, username: &str, email: &str, password: &str) -> Result<UserRow> {
        UserRepo::create(&*self.conn()?, username, email, password)
    }

    /// Insert a note.
    pub fn create_note(&self, opts: &CreateNoteOptions<'_>) -> Result<NoteRow> {
        NoteRepo::create(&*self.conn()?, opts)
    }

    /// Fetch one note owned by `owner`.
    pub fn get_note(&self, owner: &str, note_id: &str) -> Result<Option<NoteRow>> {
        NoteRepo::get(&*self.conn()?, owner, note_id)
    }

    /// List `owner`'s notes, newest first.
    pub fn list_notes_for_user(&self, owner: &str) -> Result<Vec<NoteRow>> {
        NoteRepo::list_for_user(&*self.conn()?, owner)
    }

    /// Patch one note owned by `owner`; `false` when zero rows changed.
    pub fn update_note(&self, owner: &str, note_id: &str, patch: &NotePatch<'_>) -> Result<bool> {
        NoteRepo::update(&*self.conn()?, owner, note_id, patch)
    }

    /// Delete one note owned by `owner`; `false` when zero rows changed.
    pub fn delete_note(&self, owner: &str, note_id: &str) -> Result<bool> {
        NoteRepo::delete(&*self.conn()?, owner, note_id)
    }

    /// Substring search over `owner`'s notes.
    pub fn search_notes(&self, owner: &str, query: &str) -> Result<Vec<NoteRow>> {
        NoteRepo::search(&*self.conn()?, owner, query)
    }

    /// Delete every note owned by `owner`, returning the count removed.
    pub fn delete_all_notes_for_user(&self, owner: &str) -> Result<u64> {
        NoteRepo::delete_all_for_user(&*self.conn()?, owner)
    }
}
