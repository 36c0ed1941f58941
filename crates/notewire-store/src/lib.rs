//! # notewire-store
//!
//! The two collaborators the protocol core calls into:
//!
//! - [`store::NoteStore`] — users and notes in SQLite behind an r2d2 pool,
//!   with ownership enforced in every row filter
//! - [`cipher::NoteCipher`] — AES-256-GCM over note content, key derived
//!   from a configured passphrase
//!
//! Note identifiers and owner ids are opaque strings here; the protocol
//! layer owns their meaning.

#![deny(unsafe_code)]

pub mod cipher;
pub mod errors;
pub mod sqlite;
pub mod store;

pub use cipher::{CipherError, NoteCipher};
pub use errors::{Result, StoreError};
pub use store::NoteStore;
