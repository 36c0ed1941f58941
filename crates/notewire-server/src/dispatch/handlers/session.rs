//! Handshake handlers: init, restore_session.

use async_trait::async_trait;
use notewire_core::ids::{ClientId, UserId};
use notewire_core::wire::Request;
use tracing::instrument;

use crate::dispatch::errors::HandlerError;
use crate::dispatch::handlers::optional_ref;
use crate::dispatch::{Ack, ActionHandler, DispatchContext};

/// Acknowledge a fresh connection identity.
pub struct InitHandler;

#[async_trait]
impl ActionHandler for InitHandler {
    #[instrument(skip_all, fields(action = "init"))]
    async fn handle(
        &self,
        _req: &Request,
        caller: &ClientId,
        _ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        Ok(Ack::connected("Connected").with_field("client_id", caller.as_str()))
    }
}

/// Re-associate an authenticated user with the connection after a reconnect.
pub struct RestoreSessionHandler;

#[async_trait]
impl ActionHandler for RestoreSessionHandler {
    #[instrument(skip_all, fields(action = "restore_session"))]
    async fn handle(
        &self,
        req: &Request,
        caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        if let Some(user_id) = optional_ref(req, "user_id") {
            ctx.registry.bind(UserId::new(user_id), caller.clone());
        }
        Ok(Ack::connected("Session restored").with_field("client_id", caller.as_str()))
    }
}
