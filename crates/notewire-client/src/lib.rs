//! # notewire-client
//!
//! Client side of the session protocol:
//!
//! - [`transport`] — the `Connector`/`Transport` abstraction and its
//!   `tokio-tungstenite` implementation
//! - [`manager::ConnectionManager`] — handshake, strictly sequential
//!   request/response, bounded resend, background liveness loop
//! - [`facade::SessionClient`] — the user-facing operations (login,
//!   register, note CRUD, search, logout)

#![deny(unsafe_code)]

pub mod errors;
pub mod facade;
pub mod manager;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::ClientError;
pub use facade::SessionClient;
pub use manager::{ConnectionManager, ConnectionState};
