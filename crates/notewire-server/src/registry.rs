//! Live connections and login-session bindings.

use std::collections::HashMap;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use notewire_core::ids::{ClientId, UserId};
use parking_lot::RwLock;
use tracing::{debug, info};

/// What the registry knows about a live connection.
#[derive(Clone, Debug)]
pub struct ConnectedClient {
    /// Peer address of the transport.
    pub remote_addr: SocketAddr,
    /// When the connection registered.
    pub connected_at: DateTime<Utc>,
}

/// Server-side session registry.
///
/// Tracks every live connection by its [`ClientId`] and the binding from an
/// authenticated [`UserId`] to the connection currently serving it. Bindings
/// are last-login-wins: `bind` silently replaces an existing entry, so a
/// user logged in from two clients keeps only the most recent one.
#[derive(Default)]
pub struct SessionRegistry {
    connections: RwLock<HashMap<ClientId, ConnectedClient>>,
    bindings: RwLock<HashMap<UserId, ClientId>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live connection. Re-registering the same id overwrites.
    pub fn register(&self, client: ClientId, remote_addr: SocketAddr) {
        let _ = self.connections.write().insert(
            client,
            ConnectedClient {
                remote_addr,
                connected_at: Utc::now(),
            },
        );
    }

    /// Forget a live connection. No-op when absent.
    pub fn remove(&self, client: &ClientId) {
        let _ = self.connections.write().remove(client);
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Bind a user to the connection serving it, replacing any existing
    /// binding for that user.
    pub fn bind(&self, user: UserId, client: ClientId) {
        info!(user = %user, client = %client, "session bound");
        let _ = self.bindings.write().insert(user, client);
    }

    /// Remove a user's binding. No-op when absent.
    pub fn unbind(&self, user: &UserId) {
        if self.bindings.write().remove(user).is_some() {
            info!(user = %user, "session unbound");
        }
    }

    /// The connection currently serving `user`, if any.
    pub fn bound_client(&self, user: &UserId) -> Option<ClientId> {
        self.bindings.read().get(user).cloned()
    }

    /// Drop every binding pointing at a disconnected client.
    ///
    /// Covers clients that log in and then vanish without a logout.
    pub fn on_disconnect(&self, client: &ClientId) {
        let mut bindings = self.bindings.write();
        let before = bindings.len();
        bindings.retain(|_, bound| bound != client);
        let dropped = before - bindings.len();
        if dropped > 0 {
            debug!(client = %client, dropped, "dropped bindings for disconnected client");
        }
    }
}
