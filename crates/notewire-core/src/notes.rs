//! Shared projections: the note view and the authenticated user identity.
//!
//! The server produces these from storage rows (redacting internal state),
//! the client consumes them from response payloads. Both directions go
//! through [`WireValue`] maps so extended id/timestamp values survive the
//! trip.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::errors::ProtocolError;
use crate::ids::UserId;
use crate::wire::{WireMap, WireValue};

/// Error returned for a note type outside the closed set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid note type")]
pub struct ParseNoteTypeError;

/// The kind of content a note holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteType {
    /// Plain text.
    #[default]
    Text,
    /// Voice recording.
    Voice,
    /// Image.
    Image,
}

impl NoteType {
    /// The wire and storage spelling of this note type.
    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Text => "text",
            NoteType::Voice => "voice",
            NoteType::Image => "image",
        }
    }
}

impl std::str::FromStr for NoteType {
    type Err = ParseNoteTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(NoteType::Text),
            "voice" => Ok(NoteType::Voice),
            "image" => Ok(NoteType::Image),
            _ => Err(ParseNoteTypeError),
        }
    }
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The redacted projection of a stored note returned to clients.
///
/// Content is already decrypted (or the placeholder, when decryption
/// failed server-side); the id is the opaque public form.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteView {
    /// Opaque note identifier.
    pub id: String,
    /// Note title.
    pub title: String,
    /// Readable content.
    pub content: String,
    /// Content kind.
    pub note_type: NoteType,
    /// Whether the stored content is encrypted at rest.
    pub is_encrypted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl NoteView {
    /// Project to a wire map (`id` as `$id`, times as `$ts`).
    pub fn to_wire(&self) -> WireValue {
        let mut map = WireMap::new();
        let _ = map.insert("id".to_string(), WireValue::id(&*self.id));
        let _ = map.insert("title".to_string(), WireValue::Text(self.title.clone()));
        let _ = map.insert("content".to_string(), WireValue::Text(self.content.clone()));
        let _ = map.insert(
            "note_type".to_string(),
            WireValue::Text(self.note_type.as_str().to_string()),
        );
        let _ = map.insert("is_encrypted".to_string(), WireValue::Bool(self.is_encrypted));
        let _ = map.insert(
            "created_at".to_string(),
            WireValue::Timestamp(self.created_at),
        );
        let _ = map.insert(
            "updated_at".to_string(),
            WireValue::Timestamp(self.updated_at),
        );
        WireValue::Map(map)
    }

    /// Rebuild from a wire map.
    pub fn from_wire(value: &WireValue) -> Result<Self, ProtocolError> {
        let map = value.as_map().ok_or(ProtocolError::InvalidField {
            field: "notes",
            expected: "map",
        })?;
        Ok(Self {
            id: require_id(map, "id")?,
            title: require_text(map, "title")?,
            content: require_text(map, "content")?,
            note_type: require_text(map, "note_type")?
                .parse()
                .map_err(|_| ProtocolError::InvalidField {
                    field: "note_type",
                    expected: "note type",
                })?,
            is_encrypted: map
                .get("is_encrypted")
                .and_then(WireValue::as_bool)
                .unwrap_or(false),
            created_at: require_timestamp(map, "created_at")?,
            updated_at: require_timestamp(map, "updated_at")?,
        })
    }

    /// Rebuild a `notes` list field, as returned by `get_notes` / `search_notes`.
    pub fn list_from_wire(value: &WireValue) -> Result<Vec<Self>, ProtocolError> {
        value
            .as_list()
            .ok_or(ProtocolError::InvalidField {
                field: "notes",
                expected: "list",
            })?
            .iter()
            .map(Self::from_wire)
            .collect()
    }
}

/// The locally authenticated user, established by a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    /// Opaque user id.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Login email.
    pub email: String,
}

impl UserIdentity {
    /// Project to the `user` wire map of a login response.
    pub fn to_wire(&self) -> WireValue {
        let mut map = WireMap::new();
        let _ = map.insert("id".to_string(), WireValue::id(self.id.as_str()));
        let _ = map.insert(
            "username".to_string(),
            WireValue::Text(self.username.clone()),
        );
        let _ = map.insert("email".to_string(), WireValue::Text(self.email.clone()));
        WireValue::Map(map)
    }

    /// Rebuild from the `user` field of a login response.
    pub fn from_wire(value: &WireValue) -> Result<Self, ProtocolError> {
        let map = value.as_map().ok_or(ProtocolError::InvalidField {
            field: "user",
            expected: "map",
        })?;
        Ok(Self {
            id: UserId::new(require_id(map, "id")?),
            username: require_text(map, "username")?,
            email: require_text(map, "email")?,
        })
    }
}

fn require_text(map: &WireMap, field: &'static str) -> Result<String, ProtocolError> {
    map.get(field)
        .and_then(WireValue::as_str)
        .map(str::to_string)
        .ok_or(ProtocolError::InvalidField {
            field,
            expected: "string",
        })
}

fn require_id(map: &WireMap, field: &'static str) -> Result<String, ProtocolError> {
    map.get(field)
        .and_then(WireValue::as_id)
        .map(str::to_string)
        .ok_or(ProtocolError::InvalidField {
            field,
            expected: "identifier",
        })
}

fn require_timestamp(map: &WireMap, field: &'static str) -> Result<DateTime<Utc>, ProtocolError> {
    map.get(field)
        .and_then(WireValue::as_timestamp)
        .ok_or(ProtocolError::InvalidField {
            field,
            expected: "timestamp",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_view() -> NoteView {
        NoteView {
            id: "note_0198c0de".to_string(),
            title: "T".to_string(),
            content: "hello".to_string(),
            note_type: NoteType::Text,
            is_encrypted: true,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        }
    }

    #[test]
    fn note_view_wire_round_trip() {
        let view = sample_view();
        assert_eq!(NoteView::from_wire(&view.to_wire()).unwrap(), view);
    }

    #[test]
    fn note_list_wire_round_trip() {
        let views = vec![sample_view(), sample_view()];
        let wire = WireValue::List(views.iter().map(NoteView::to_wire).collect());
        assert_eq!(NoteView::list_from_wire(&wire).unwrap(), views);
    }

    #[test]
    fn note_view_id_travels_as_extended_id() {
        let wire = sample_view().to_wire();
        let map = wire.as_map().unwrap();
        assert_eq!(map.get("id").unwrap().as_id(), Some("note_0198c0de"));
    }

    #[test]
    fn note_view_rejects_plain_string_id() {
        let wire = sample_view().to_wire();
        let WireValue::Map(mut map) = wire else {
            unreachable!()
        };
        let _ = map.insert("id".to_string(), WireValue::Text("note_x".to_string()));
        assert!(NoteView::from_wire(&WireValue::Map(map)).is_err());
    }

    #[test]
    fn user_identity_wire_round_trip() {
        let user = UserIdentity {
            id: UserId::new("usr_1"),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
        };
        assert_eq!(UserIdentity::from_wire(&user.to_wire()).unwrap(), user);
    }

    #[test]
    fn note_type_parse_rejects_unknown() {
        assert_eq!("text".parse::<NoteType>(), Ok(NoteType::Text));
        assert_eq!("voice".parse::<NoteType>(), Ok(NoteType::Voice));
        assert_eq!("image".parse::<NoteType>(), Ok(NoteType::Image));
        assert_eq!("video".parse::<NoteType>(), Err(ParseNoteTypeError));
    }
}
