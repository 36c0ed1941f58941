//! Wire values, message envelopes, and the text codec.
//!
//! Messages travel as single JSON text frames. A request is an object whose
//! `action` key is the discriminant; everything else is a payload field. A
//! response always carries `status` and `message`, optionally echoes the
//! `action`, and may attach payload fields.
//!
//! ## Extended values
//!
//! Plain JSON cannot distinguish a server-assigned identifier or a timestamp
//! from an ordinary string, so the codec reserves two single-key object
//! forms as the canonical extended representation:
//!
//! - `{"$id": "<opaque id>"}` — a document identifier ([`WireValue::Id`])
//! - `{"$ts": "<RFC 3339 UTC timestamp>"}` — a timestamp ([`WireValue::Timestamp`])
//!
//! Only the exact single-key form is reserved; an object carrying `$id`
//! next to other keys decodes as an ordinary map. Both forms round-trip
//! losslessly through `encode`/`decode`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::ProtocolError;

/// Payload fields of a request or response.
pub type WireMap = BTreeMap<String, WireValue>;

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

/// A single protocol value, including the extended `$id`/`$ts` forms.
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(serde_json::Number),
    /// Plain text.
    Text(String),
    /// Ordered list.
    List(Vec<WireValue>),
    /// String-keyed map.
    Map(WireMap),
    /// Opaque document identifier (extended form).
    Id(String),
    /// UTC timestamp (extended form).
    Timestamp(DateTime<Utc>),
}

impl WireValue {
    /// Build an [`WireValue::Id`] from anything string-like.
    pub fn id(raw: impl Into<String>) -> Self {
        Self::Id(raw.into())
    }

    /// The text payload, if this is [`WireValue::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if this is [`WireValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric payload as `i64`, if representable.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// The list payload, if this is [`WireValue::List`].
    pub fn as_list(&self) -> Option<&[WireValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The map payload, if this is [`WireValue::Map`].
    pub fn as_map(&self) -> Option<&WireMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The identifier payload, if this is [`WireValue::Id`].
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Self::Id(raw) => Some(raw),
            _ => None,
        }
    }

    /// The timestamp payload, if this is [`WireValue::Timestamp`].
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Lower to plain JSON, projecting extended values to their tagged form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(WireValue::to_json).collect()),
            Self::Map(map) => {
                let mut obj = serde_json::Map::new();
                for (key, value) in map {
                    let _ = obj.insert(key.clone(), value.to_json());
                }
                Value::Object(obj)
            }
            Self::Id(raw) => {
                let mut obj = serde_json::Map::new();
                let _ = obj.insert("$id".to_string(), Value::String(raw.clone()));
                Value::Object(obj)
            }
            Self::Timestamp(t) => {
                let mut obj = serde_json::Map::new();
                let _ = obj.insert("$ts".to_string(), Value::String(t.to_rfc3339()));
                Value::Object(obj)
            }
        }
    }

    /// Lift plain JSON, recognizing the reserved single-key tagged forms.
    pub fn from_json(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(items) => Ok(Self::List(
                items
                    .into_iter()
                    .map(WireValue::from_json)
                    .collect::<Result<_, _>>()?,
            )),
            Value::Object(obj) => {
                if obj.len() == 1 {
                    if let Some(raw) = obj.get("$id") {
                        let raw = raw.as_str().ok_or(ProtocolError::InvalidField {
                            field: "$id",
                            expected: "string",
                        })?;
                        return Ok(Self::Id(raw.to_string()));
                    }
                    if let Some(raw) = obj.get("$ts") {
                        let raw = raw.as_str().ok_or(ProtocolError::InvalidField {
                            field: "$ts",
                            expected: "string",
                        })?;
                        let parsed = DateTime::parse_from_rfc3339(raw)
                            .map_err(|_| ProtocolError::InvalidTimestamp(raw.to_string()))?;
                        return Ok(Self::Timestamp(parsed.with_timezone(&Utc)));
                    }
                }
                let mut map = WireMap::new();
                for (key, value) in obj {
                    let _ = map.insert(key, WireValue::from_json(value)?);
                }
                Ok(Self::Map(map))
            }
        }
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for WireValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for WireValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(items: Vec<WireValue>) -> Self {
        Self::List(items)
    }
}

impl From<DateTime<Utc>> for WireValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of request discriminants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Handshake: establish a fresh connection identity.
    Init,
    /// Handshake: re-associate an authenticated user with this connection.
    RestoreSession,
    /// Authenticate with email and password.
    Login,
    /// Create a user account.
    Register,
    /// Create a note.
    CreateNote,
    /// List the caller's notes.
    GetNotes,
    /// Patch a note's title and/or content.
    UpdateNote,
    /// Delete one note.
    DeleteNote,
    /// Substring search over the caller's notes.
    SearchNotes,
    /// Delete every note the caller owns.
    DeleteAllNotes,
    /// End the login session.
    Logout,
}

impl Action {
    /// Every action, for exhaustive registration and tests.
    pub const ALL: [Action; 11] = [
        Action::Init,
        Action::RestoreSession,
        Action::Login,
        Action::Register,
        Action::CreateNote,
        Action::GetNotes,
        Action::UpdateNote,
        Action::DeleteNote,
        Action::SearchNotes,
        Action::DeleteAllNotes,
        Action::Logout,
    ];

    /// The wire spelling of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::RestoreSession => "restore_session",
            Action::Login => "login",
            Action::Register => "register",
            Action::CreateNote => "create_note",
            Action::GetNotes => "get_notes",
            Action::UpdateNote => "update_note",
            Action::DeleteNote => "delete_note",
            Action::SearchNotes => "search_notes",
            Action::DeleteAllNotes => "delete_all_notes",
            Action::Logout => "logout",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The operation succeeded.
    Success,
    /// The operation failed; `message` says why.
    Error,
    /// Handshake acknowledgement.
    Connected,
}

impl Status {
    /// The wire spelling of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
            Status::Connected => "connected",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Status::Success),
            "error" => Ok(Status::Error),
            "connected" => Ok(Status::Connected),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

/// A client-to-server message. Always carries an action.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// Dispatch discriminant.
    pub action: Action,
    /// Diagnostic correlation id. Attached for log lines only — request /
    /// response pairing is strictly sequential per connection, never by id.
    pub request_id: Option<String>,
    /// Payload fields.
    pub fields: WireMap,
}

impl Request {
    /// A request with no payload.
    pub fn new(action: Action) -> Self {
        Self {
            action,
            request_id: None,
            fields: WireMap::new(),
        }
    }

    /// Attach a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<WireValue>) -> Self {
        let _ = self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&WireValue> {
        self.fields.get(key)
    }
}

/// A server-to-client message. Always carries a status and a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Terminal status.
    pub status: Status,
    /// Human-readable outcome.
    pub message: String,
    /// Echo of the request's action, when responding to one.
    pub action: Option<Action>,
    /// Payload fields.
    pub fields: WireMap,
}

impl Response {
    /// A `success` response.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            action: None,
            fields: WireMap::new(),
        }
    }

    /// An `error` response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            action: None,
            fields: WireMap::new(),
        }
    }

    /// A handshake `connected` response.
    pub fn connected(message: impl Into<String>) -> Self {
        Self {
            status: Status::Connected,
            message: message.into(),
            action: None,
            fields: WireMap::new(),
        }
    }

    /// Attach the action echo.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Attach a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<WireValue>) -> Self {
        let _ = self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&WireValue> {
        self.fields.get(key)
    }

    /// Whether this is a `success` response.
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Whether this is a handshake acknowledgement.
    pub fn is_connected(&self) -> bool {
        self.status == Status::Connected
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a request to a JSON text frame.
///
/// Payload fields are flattened into the top-level object; the `action` and
/// `request_id` envelope keys are written last and win any collision.
pub fn encode_request(req: &Request) -> String {
    let mut obj = serde_json::Map::new();
    for (key, value) in &req.fields {
        let _ = obj.insert(key.clone(), value.to_json());
    }
    let _ = obj.insert(
        "action".to_string(),
        Value::String(req.action.as_str().to_string()),
    );
    if let Some(rid) = &req.request_id {
        let _ = obj.insert("request_id".to_string(), Value::String(rid.clone()));
    }
    Value::Object(obj).to_string()
}

/// Parse a JSON text frame into a request.
pub fn decode_request(frame: &str) -> Result<Request, ProtocolError> {
    let mut obj = parse_envelope(frame)?;
    let action = take_string(&mut obj, "action")?
        .ok_or(ProtocolError::MissingField("action"))?
        .parse::<Action>()?;
    let request_id = take_string(&mut obj, "request_id")?;
    Ok(Request {
        action,
        request_id,
        fields: fields_from(obj)?,
    })
}

/// Serialize a response to a JSON text frame.
pub fn encode_response(resp: &Response) -> String {
    let mut obj = serde_json::Map::new();
    for (key, value) in &resp.fields {
        let _ = obj.insert(key.clone(), value.to_json());
    }
    let _ = obj.insert(
        "status".to_string(),
        Value::String(resp.status.as_str().to_string()),
    );
    let _ = obj.insert("message".to_string(), Value::String(resp.message.clone()));
    if let Some(action) = resp.action {
        let _ = obj.insert(
            "action".to_string(),
            Value::String(action.as_str().to_string()),
        );
    }
    Value::Object(obj).to_string()
}

/// Parse a JSON text frame into a response.
pub fn decode_response(frame: &str) -> Result<Response, ProtocolError> {
    let mut obj = parse_envelope(frame)?;
    let status = take_string(&mut obj, "status")?
        .ok_or(ProtocolError::MissingField("status"))?
        .parse::<Status>()?;
    let message =
        take_string(&mut obj, "message")?.ok_or(ProtocolError::MissingField("message"))?;
    let action = take_string(&mut obj, "action")?
        .map(|s| s.parse::<Action>())
        .transpose()?;
    Ok(Response {
        status,
        message,
        action,
        fields: fields_from(obj)?,
    })
}

fn parse_envelope(frame: &str) -> Result<serde_json::Map<String, Value>, ProtocolError> {
    let value: Value = serde_json::from_str(frame).map_err(ProtocolError::InvalidJson)?;
    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(ProtocolError::NotAnObject),
    }
}

fn take_string(
    obj: &mut serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ProtocolError> {
    match obj.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ProtocolError::InvalidField {
            field,
            expected: "string",
        }),
    }
}

fn fields_from(obj: serde_json::Map<String, Value>) -> Result<WireMap, ProtocolError> {
    let mut fields = WireMap::new();
    for (key, value) in obj {
        let _ = fields.insert(key, WireValue::from_json(value)?);
    }
    Ok(fields)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    // ── envelope round trips ─────────────────────────────────────────────

    #[test]
    fn request_round_trip() {
        let req = Request::new(Action::Login)
            .with_field("email", "a@x.com")
            .with_field("password", "p");
        let decoded = decode_request(&encode_request(&req)).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn request_round_trip_with_request_id() {
        let mut req = Request::new(Action::GetNotes).with_field("user_id", "usr_1");
        req.request_id = Some("req_42".to_string());
        assert_eq!(decode_request(&encode_request(&req)).unwrap(), req);
    }

    #[test]
    fn response_round_trip_with_extended_values() {
        let resp = Response::success("Note created successfully")
            .with_action(Action::CreateNote)
            .with_field("note_id", WireValue::id("note_abc"))
            .with_field("created_at", WireValue::Timestamp(ts(1_700_000_000)));
        let decoded = decode_response(&encode_response(&resp)).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn extended_id_survives_as_id_not_text() {
        let resp = Response::success("ok").with_field("note_id", WireValue::id("note_abc"));
        let decoded = decode_response(&encode_response(&resp)).unwrap();
        assert_eq!(decoded.field("note_id").unwrap().as_id(), Some("note_abc"));
        assert_eq!(decoded.field("note_id").unwrap().as_str(), None);
    }

    #[test]
    fn timestamp_preserves_subsecond_precision() {
        let t = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let resp = Response::success("ok").with_field("at", WireValue::Timestamp(t));
        let decoded = decode_response(&encode_response(&resp)).unwrap();
        assert_eq!(decoded.field("at").unwrap().as_timestamp(), Some(t));
    }

    // ── decode failures ──────────────────────────────────────────────────

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(matches!(
            decode_request("{nope"),
            Err(ProtocolError::InvalidJson(_))
        ));
    }

    #[test]
    fn decode_rejects_non_object_envelope() {
        assert!(matches!(
            decode_request("[1, 2]"),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            decode_response("\"hello\""),
            Err(ProtocolError::NotAnObject)
        ));
    }

    #[test]
    fn decode_rejects_request_without_action() {
        assert!(matches!(
            decode_request(r#"{"email": "a@x.com"}"#),
            Err(ProtocolError::MissingField("action"))
        ));
    }

    #[test]
    fn decode_rejects_unknown_action() {
        let err = decode_request(r#"{"action": "frobnicate"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownAction(_)));
        assert_eq!(err.to_string(), "Unknown action");
    }

    #[test]
    fn decode_rejects_response_without_status() {
        assert!(matches!(
            decode_response(r#"{"message": "hi"}"#),
            Err(ProtocolError::MissingField("status"))
        ));
    }

    #[test]
    fn decode_rejects_response_without_message() {
        assert!(matches!(
            decode_response(r#"{"status": "success"}"#),
            Err(ProtocolError::MissingField("message"))
        ));
    }

    #[test]
    fn decode_rejects_unknown_status() {
        assert!(matches!(
            decode_response(r#"{"status": "meh", "message": ""}"#),
            Err(ProtocolError::UnknownStatus(_))
        ));
    }

    #[test]
    fn decode_rejects_non_string_action() {
        assert!(matches!(
            decode_request(r#"{"action": 7}"#),
            Err(ProtocolError::InvalidField {
                field: "action",
                ..
            })
        ));
    }

    #[test]
    fn decode_rejects_bad_extended_timestamp() {
        assert!(matches!(
            decode_response(r#"{"status": "success", "message": "", "at": {"$ts": "yesterday"}}"#),
            Err(ProtocolError::InvalidTimestamp(_))
        ));
    }

    // ── extended form boundaries ─────────────────────────────────────────

    #[test]
    fn dollar_key_with_siblings_is_a_plain_map() {
        let frame = r#"{"status": "success", "message": "", "v": {"$id": "x", "other": 1}}"#;
        let decoded = decode_response(frame).unwrap();
        let map = decoded.field("v").unwrap().as_map().unwrap();
        assert_eq!(map.get("$id").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn non_string_dollar_id_is_rejected() {
        let frame = r#"{"status": "success", "message": "", "v": {"$id": 3}}"#;
        assert!(matches!(
            decode_response(frame),
            Err(ProtocolError::InvalidField { field: "$id", .. })
        ));
    }

    #[test]
    fn extended_values_nest_inside_lists_and_maps() {
        let resp = Response::success("ok").with_field(
            "notes",
            vec![WireValue::Map(WireMap::from([
                ("id".to_string(), WireValue::id("note_1")),
                (
                    "created_at".to_string(),
                    WireValue::Timestamp(ts(1_700_000_000)),
                ),
            ]))],
        );
        assert_eq!(decode_response(&encode_response(&resp)).unwrap(), resp);
    }

    #[test]
    fn envelope_keys_win_over_colliding_fields() {
        let req = Request::new(Action::Login).with_field("action", "bogus");
        let decoded = decode_request(&encode_request(&req)).unwrap();
        assert_eq!(decoded.action, Action::Login);
        assert!(decoded.field("action").is_none());
    }

    #[test]
    fn action_spellings_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    // ── property: decode(encode(m)) == m ─────────────────────────────────

    fn arb_scalar() -> impl Strategy<Value = WireValue> {
        prop_oneof![
            Just(WireValue::Null),
            any::<bool>().prop_map(WireValue::Bool),
            any::<i64>().prop_map(|n| WireValue::Number(n.into())),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(|f| {
                    serde_json::Number::from_f64(f).map_or(WireValue::Null, WireValue::Number)
                }),
            "[ -~]{0,24}".prop_map(WireValue::Text),
            "[a-z0-9_]{1,20}".prop_map(WireValue::Id),
            (0i64..4_102_444_800i64, 0u32..1_000_000_000u32)
                .prop_map(|(s, n)| WireValue::Timestamp(Utc.timestamp_opt(s, n).unwrap())),
        ]
    }

    fn arb_value() -> impl Strategy<Value = WireValue> {
        arb_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(WireValue::List),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4).prop_map(WireValue::Map),
            ]
        })
    }

    fn arb_fields() -> impl Strategy<Value = WireMap> {
        prop::collection::btree_map(
            "[a-z_]{1,8}".prop_filter("reserved envelope key", |k| {
                !matches!(k.as_str(), "action" | "request_id" | "status" | "message")
            }),
            arb_value(),
            0..5,
        )
    }

    proptest! {
        #[test]
        fn prop_request_round_trip(
            action in prop::sample::select(Action::ALL.to_vec()),
            request_id in prop::option::of("[a-z0-9_]{1,12}"),
            fields in arb_fields(),
        ) {
            let req = Request { action, request_id, fields };
            prop_assert_eq!(decode_request(&encode_request(&req)).unwrap(), req);
        }

        #[test]
        fn prop_response_round_trip(
            status in prop::sample::select(vec![Status::Success, Status::Error, Status::Connected]),
            message in "[ -~]{0,32}",
            action in prop::option::of(prop::sample::select(Action::ALL.to_vec())),
            fields in arb_fields(),
        ) {
            let resp = Response { status, message, action, fields };
            prop_assert_eq!(decode_response(&encode_response(&resp)).unwrap(), resp);
        }
    }
}
