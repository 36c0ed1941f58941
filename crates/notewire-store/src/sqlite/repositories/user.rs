//! User repository — accounts in the `users` table.

use notewire_core::ids::UserId;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::errors::{Result, StoreError};
use crate::sqlite::row_types::UserRow;

/// User repository — stateless, every method takes `&Connection`.
pub struct UserRepo;

impl UserRepo {
    /// Create a new account. A second registration with the same email
    /// fails with [`StoreError::DuplicateEmail`].
    pub fn create(
        conn: &Connection,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRow> {
        let id = UserId::generate().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn
            .execute(
                "INSERT INTO users (id, username, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, username, email, password, now, now],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => StoreError::DuplicateEmail,
                _ => StoreError::from(e),
            })?;
        Ok(UserRow {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Look up an account by email.
    pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
        let row = conn
            .query_row(
                "SELECT id, username, email, password, created_at, updated_at
                 FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        password: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
