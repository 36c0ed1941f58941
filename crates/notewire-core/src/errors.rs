//! Protocol-level errors shared by the codec and both endpoints.

use thiserror::Error;

/// Everything [`crate::wire`] can reject at decode time.
///
/// Display strings double as the `message` of the error response the server
/// sends back for a malformed frame, so the user-facing variants carry the
/// exact protocol wording (`"Invalid JSON"`, `"Unknown action"`).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not parseable JSON at all.
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    /// The frame parsed, but the top level is not a JSON object.
    #[error("message envelope must be a JSON object")]
    NotAnObject,

    /// A required envelope field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// An envelope field has the wrong JSON type.
    #[error("field `{field}` must be a {expected}")]
    InvalidField {
        /// Offending field name.
        field: &'static str,
        /// Expected JSON type, e.g. `"string"`.
        expected: &'static str,
    },

    /// The request's `action` discriminant is not part of the protocol.
    #[error("Unknown action")]
    UnknownAction(String),

    /// The response's `status` discriminant is not part of the protocol.
    #[error("unknown status `{0}`")]
    UnknownStatus(String),

    /// A `$ts` extended value does not hold an ISO-8601 timestamp.
    #[error("invalid `$ts` timestamp `{0}`")]
    InvalidTimestamp(String),
}
