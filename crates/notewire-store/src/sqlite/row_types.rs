//! Row shapes returned by the repositories.

/// A row of the `users` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    /// Opaque user id (`usr_` prefix).
    pub id: String,
    /// Display name.
    pub username: String,
    /// Login email, unique.
    pub email: String,
    /// Stored verbatim — password hardening is out of scope here.
    pub password: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 update time.
    pub updated_at: String,
}

/// A row of the `notes` table. Content is ciphertext when `is_encrypted`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteRow {
    /// Opaque note id (`note_` prefix).
    pub id: String,
    /// Owning user id; absent for notes created without a login.
    pub user_id: Option<String>,
    /// Note title.
    pub title: String,
    /// Stored content (ciphertext when `is_encrypted`).
    pub content: String,
    /// Note type spelling (`text` / `voice` / `image`).
    pub note_type: String,
    /// Whether `content` is ciphertext.
    pub is_encrypted: bool,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 update time.
    pub updated_at: String,
}
