//! Action handlers, grouped by concern, plus shared payload helpers.

pub mod auth;
pub mod notes;
pub mod session;

use notewire_core::wire::{Request, WireValue};

use super::errors::HandlerError;

/// A required text field.
pub(crate) fn require_str<'a>(
    req: &'a Request,
    field: &'static str,
) -> Result<&'a str, HandlerError> {
    req.field(field)
        .and_then(WireValue::as_str)
        .ok_or_else(|| HandlerError::Validation(format!("missing required field `{field}`")))
}

/// An optional text field; extended ids are accepted where clients echo a
/// server-assigned identifier back.
pub(crate) fn optional_ref<'a>(req: &'a Request, field: &str) -> Option<&'a str> {
    let value = req.field(field)?;
    value.as_str().or_else(|| value.as_id())
}

/// The caller's `user_id`, or the login-required error.
pub(crate) fn require_user_id(req: &Request) -> Result<&str, HandlerError> {
    optional_ref(req, "user_id").ok_or(HandlerError::LoginRequired)
}

/// A boolean flag field, absent meaning `false`.
pub(crate) fn flag(req: &Request, field: &str) -> bool {
    req.field(field).and_then(WireValue::as_bool).unwrap_or(false)
}
