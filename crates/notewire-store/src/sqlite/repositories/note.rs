//! Note repository — CRUD and search over the `notes` table.
//!
//! Every per-note operation filters on `id AND user_id`, so ownership is
//! enforced at the row filter and a wrong owner is indistinguishable from
//! a missing note (zero rows affected).

use notewire_core::ids::NoteId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::NoteRow;

const NOTE_COLUMNS: &str =
    "id, user_id, title, content, note_type, is_encrypted, created_at, updated_at";

/// Options for creating a note.
pub struct CreateNoteOptions<'a> {
    /// Owning user, when the caller is logged in.
    pub user_id: Option<&'a str>,
    /// Note title.
    pub title: &'a str,
    /// Content to store (already ciphertext when `is_encrypted`).
    pub content: &'a str,
    /// Note type spelling.
    pub note_type: &'a str,
    /// Whether `content` is ciphertext.
    pub is_encrypted: bool,
}

/// Patch applied by `update`; `None` keeps the stored value.
#[derive(Default)]
pub struct NotePatch<'a> {
    /// New title.
    pub title: Option<&'a str>,
    /// New content (already ciphertext for encrypted notes).
    pub content: Option<&'a str>,
}

/// Note repository — stateless, every method takes `&Connection`.
pub struct NoteRepo;

impl NoteRepo {
    /// Insert a new note.
    pub fn create(conn: &Connection, opts: &CreateNoteOptions<'_>) -> Result<NoteRow> {
        let id = NoteId::generate().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO notes (id, user_id, title, content, note_type, is_encrypted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                opts.user_id,
                opts.title,
                opts.content,
                opts.note_type,
                opts.is_encrypted,
                now,
                now
            ],
        )?;
        Ok(NoteRow {
            id,
            user_id: opts.user_id.map(String::from),
            title: opts.title.to_string(),
            content: opts.content.to_string(),
            note_type: opts.note_type.to_string(),
            is_encrypted: opts.is_encrypted,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch one note owned by `owner`.
    pub fn get(conn: &Connection, owner: &str, note_id: &str) -> Result<Option<NoteRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND user_id = ?2"),
                params![note_id, owner],
                row_to_note,
            )
            .optional()?;
        Ok(row)
    }

    /// List `owner`'s notes, newest first.
    pub fn list_for_user(conn: &Connection, owner: &str) -> Result<Vec<NoteRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map(params![owner], row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Patch one note owned by `owner`. Returns `true` if a row changed.
    pub fn update(
        conn: &Connection,
        owner: &str,
        note_id: &str,
        patch: &NotePatch<'_>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE notes
             SET title = COALESCE(?1, title),
                 content = COALESCE(?2, content),
                 updated_at = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![patch.title, patch.content, now, note_id, owner],
        )?;
        Ok(changed > 0)
    }

    /// Delete one note owned by `owner`. Returns `true` if a row was deleted.
    pub fn delete(conn: &Connection, owner: &str, note_id: &str) -> Result<bool> {
        let changed = conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
            params![note_id, owner],
        )?;
        Ok(changed > 0)
    }

    /// Substring search over `owner`'s titles and contents, newest first.
    pub fn search(conn: &Connection, owner: &str, query: &str) -> Result<Vec<NoteRow>> {
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE user_id = ?1 AND (title LIKE ?2 ESCAPE '\\' OR content LIKE ?2 ESCAPE '\\')
             ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map(params![owner, pattern], row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete every note owned by `owner`. Returns the number removed.
    pub fn delete_all_for_user(conn: &Connection, owner: &str) -> Result<u64> {
        let changed = conn.execute("DELETE FROM notes WHERE user_id = ?1", params![owner])?;
        Ok(changed as u64)
    }
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        note_type: row.get(4)?,
        is_encrypted: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Escape LIKE wildcards so a query matches literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
