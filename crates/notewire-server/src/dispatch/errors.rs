//! Handler failure taxonomy.
//!
//! Display strings are the exact `message` the client sees, so variants
//! carry the user-facing wording directly.

use notewire_store::{CipherError, StoreError};
use thiserror::Error;

/// Failure of a single action handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Malformed input: bad identifier format, unknown note type, missing
    /// payload field.
    #[error("{0}")]
    Validation(String),

    /// Zero rows affected on update/delete — wrong owner or unknown id.
    #[error("{0}")]
    NotFound(String),

    /// Bad credentials.
    #[error("{0}")]
    Auth(String),

    /// The action needs a `user_id` and none was supplied.
    #[error("You need to login first")]
    LoginRequired,

    /// Storage collaborator failure (e.g. duplicate email).
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Cipher collaborator refused to encrypt new content.
    #[error("encryption failed")]
    Cipher(#[from] CipherError),
}
