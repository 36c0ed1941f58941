//! # notewire-server
//!
//! Server side of the session protocol:
//!
//! - [`registry::SessionRegistry`] — live connections and user → connection
//!   bindings
//! - [`dispatch`] — action handler trait, registry, and the handlers for
//!   every protocol action
//! - [`connection`] — per-connection WebSocket loop: handshake first, then
//!   strictly sequential decode → dispatch → respond
//! - [`server::NoteServer`] — listener accept loop, one task per connection
//!
//! Collaborators (store, cipher) are constructed by the process and injected
//! through [`dispatch::DispatchContext`].

#![deny(unsafe_code)]

pub mod connection;
pub mod dispatch;
pub mod registry;
pub mod server;

pub use server::NoteServer;
