//! Branded identifier newtypes.
//!
//! All identifiers travel as opaque strings on the wire and in storage.
//! Server-generated values carry a short type prefix (`usr_`, `note_`,
//! `cli_`) followed by a UUIDv7, but only [`NoteId::parse`] enforces the
//! format — connection identities are accepted verbatim from clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier fails format validation.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid note id")]
pub struct ParseIdError;

/// Identity of a transport endpoint, generated once per client process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generate a fresh connection identity.
    pub fn generate() -> Self {
        Self(format!("cli_{}", Uuid::now_v7()))
    }

    /// Wrap an identity received over the wire. Accepted verbatim.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a registered user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh user id.
    pub fn generate() -> Self {
        Self(format!("usr_{}", Uuid::now_v7()))
    }

    /// Wrap a stored or wire-received user id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a stored note.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a fresh note id.
    pub fn generate() -> Self {
        Self(format!("note_{}", Uuid::now_v7()))
    }

    /// Validate and wrap a note id received from a client.
    ///
    /// The dispatcher uses this as the "invalid note id format" check on
    /// `update_note` / `delete_note` before touching storage.
    pub fn parse(raw: &str) -> Result<Self, ParseIdError> {
        let suffix = raw.strip_prefix("note_").ok_or(ParseIdError)?;
        let _ = Uuid::try_parse(suffix).map_err(|_| ParseIdError)?;
        Ok(Self(raw.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
