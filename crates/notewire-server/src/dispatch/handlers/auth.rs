//! Account handlers: login, register, logout.

use async_trait::async_trait;
use notewire_core::ids::{ClientId, UserId};
use notewire_core::notes::UserIdentity;
use notewire_core::wire::{Request, WireValue};
use tracing::instrument;

use crate::dispatch::errors::HandlerError;
use crate::dispatch::handlers::{optional_ref, require_str};
use crate::dispatch::{Ack, ActionHandler, DispatchContext};

/// Authenticate by email and password.
///
/// Passwords are compared verbatim — hardening is an explicit non-goal of
/// this system.
pub struct LoginHandler;

#[async_trait]
impl ActionHandler for LoginHandler {
    #[instrument(skip_all, fields(action = "login"))]
    async fn handle(
        &self,
        req: &Request,
        caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let email = require_str(req, "email")?;
        let password = require_str(req, "password")?;

        let user = ctx
            .store
            .find_user_by_email(email)?
            .ok_or_else(|| HandlerError::Auth("User not found".to_string()))?;
        if user.password != password {
            return Err(HandlerError::Auth("Invalid password".to_string()));
        }

        let identity = UserIdentity {
            id: UserId::new(&*user.id),
            username: user.username,
            email: user.email,
        };
        ctx.registry.bind(identity.id.clone(), caller.clone());

        Ok(Ack::success("Login successful").with_field("user", identity.to_wire()))
    }
}

/// Create an account. Does not authenticate — the client logs in afterwards.
pub struct RegisterHandler;

#[async_trait]
impl ActionHandler for RegisterHandler {
    #[instrument(skip_all, fields(action = "register"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        let username = require_str(req, "username")?;
        let email = require_str(req, "email")?;
        let password = require_str(req, "password")?;

        let user = ctx.store.create_user(username, email, password)?;
        Ok(Ack::success("User created successfully").with_field("user_id", WireValue::id(&*user.id)))
    }
}

/// End the login session. Idempotent.
pub struct LogoutHandler;

#[async_trait]
impl ActionHandler for LogoutHandler {
    #[instrument(skip_all, fields(action = "logout"))]
    async fn handle(
        &self,
        req: &Request,
        _caller: &ClientId,
        ctx: &DispatchContext,
    ) -> Result<Ack, HandlerError> {
        if let Some(user_id) = optional_ref(req, "user_id") {
            ctx.registry.unbind(&UserId::new(user_id));
        }
        Ok(Ack::success("Logged out successfully"))
    }
}
