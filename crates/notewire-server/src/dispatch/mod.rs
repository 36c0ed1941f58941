//! Action dispatch: handler trait, context, and the action → handler table.

pub mod errors;
pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use notewire_core::ids::ClientId;
use notewire_core::wire::{Action, Request, Response, Status, WireMap, WireValue};
use notewire_store::{NoteCipher, NoteStore};
use tracing::{debug, instrument};

use crate::registry::SessionRegistry;
use self::errors::HandlerError;
use self::handlers::{auth, notes, session};

/// Collaborators shared by every handler.
///
/// Constructed once per server process and injected — the storage handle is
/// never ambient.
pub struct DispatchContext {
    /// Storage collaborator.
    pub store: Arc<NoteStore>,
    /// Note content cipher.
    pub cipher: Arc<NoteCipher>,
    /// Live connections and session bindings.
    pub registry: Arc<SessionRegistry>,
}

/// Successful handler outcome: status, user-facing message, payload.
#[derive(Debug)]
pub struct Ack {
    /// Response status, `success` for all ordinary actions.
    pub status: Status,
    /// User-facing outcome line.
    pub message: String,
    /// Payload fields.
    pub fields: WireMap,
}

impl Ack {
    /// A `success` acknowledgement.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            fields: WireMap::new(),
        }
    }

    /// A handshake `connected` acknowledgement.
    pub fn connected(message: impl Into<String>) -> Self {
        Self {
            status: Status::Connected,
            message: message.into(),
            fields: WireMap::new(),
        }
    }

    /// Attach a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<WireValue>) -> Self {
        let _ = self.fields.insert(key.into(), value.into());
        self
    }
}

/// One handler per protocol action.
///
/// Handlers are pure with respect to the dispatcher: all side effects go
/// through the collaborators in [`DispatchContext`].
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute the action for `caller` and produce an acknowledgement.
    async fn handle(
        &self,
        req: &Request,
        caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError>;
}

/// Maps an action discriminant to its handler and renders the response.
pub struct Dispatcher {
    handlers: HashMap<Action, Box<dyn ActionHandler>>,
    ctx: DispatchContext,
}

impl Dispatcher {
    /// Build the full action table.
    pub fn new(ctx: DispatchContext) -> Self {
        let mut handlers: HashMap<Action, Box<dyn ActionHandler>> = HashMap::new();
        let _ = handlers.insert(Action::Init, Box::new(session::InitHandler));
        let _ = handlers.insert(
            Action::RestoreSession,
            Box::new(session::RestoreSessionHandler),
        );
        let _ = handlers.insert(Action::Login, Box::new(auth::LoginHandler));
        let _ = handlers.insert(Action::Register, Box::new(auth::RegisterHandler));
        let _ = handlers.insert(Action::Logout, Box::new(auth::LogoutHandler));
        let _ = handlers.insert(Action::CreateNote, Box::new(notes::CreateNoteHandler));
        let _ = handlers.insert(Action::GetNotes, Box::new(notes::GetNotesHandler));
        let _ = handlers.insert(Action::UpdateNote, Box::new(notes::UpdateNoteHandler));
        let _ = handlers.insert(Action::DeleteNote, Box::new(notes::DeleteNoteHandler));
        let _ = handlers.insert(Action::SearchNotes, Box::new(notes::SearchNotesHandler));
        let _ = handlers.insert(
            Action::DeleteAllNotes,
            Box::new(notes::DeleteAllNotesHandler),
        );
        Self { handlers, ctx }
    }

    /// The shared collaborators.
    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    /// Run `req` through its handler and render the terminal response.
    ///
    /// Handler failures become `{status: error, message}` responses; nothing
    /// escapes as a fault. The request's action is echoed on the response.
    #[instrument(skip_all, fields(action = %req.action, client = %caller))]
    pub async fn dispatch(&self, req: &Request, caller: &ClientId) -> Response {
        let Some(handler) = self.handlers.get(&req.action) else {
            // Unreachable for decoded requests (the action enum is closed),
            // kept as a terminal answer rather than a panic.
            return Response::error("Unknown action").with_action(req.action);
        };

        match handler.handle(req, caller, &self.ctx).await {
            Ok(ack) => {
                debug!(status = ack.status.as_str(), "action handled");
                Response {
                    status: ack.status,
                    message: ack.message,
                    action: Some(req.action),
                    fields: ack.fields,
                }
            }
            Err(err) => {
                debug!(error = %err, "action failed");
                Response::error(err.to_string()).with_action(req.action)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::test_helpers::make_test_context;
    use notewire_core::wire::Request;

    #[tokio::test]
    async fn every_action_has_a_handler() {
        let harness = make_test_context();
        let dispatcher = Dispatcher::new(harness.context());
        for action in Action::ALL {
            assert!(dispatcher.handlers.contains_key(&action), "{action}");
        }
    }

    #[tokio::test]
    async fn dispatch_echoes_the_action() {
        let harness = make_test_context();
        let dispatcher = Dispatcher::new(harness.context());
        let resp = dispatcher
            .dispatch(&Request::new(Action::Init), &ClientId::new("c1"))
            .await;
        assert_eq!(resp.action, Some(Action::Init));
        assert!(resp.is_connected());
    }

    #[tokio::test]
    async fn handler_errors_become_error_responses() {
        let harness = make_test_context();
        let dispatcher = Dispatcher::new(harness.context());
        let resp = dispatcher
            .dispatch(&Request::new(Action::GetNotes), &ClientId::new("c1"))
            .await;
        assert_eq!(resp.status, Status::Error);
        assert_eq!(resp.message, "You need to login first");
    }
}
