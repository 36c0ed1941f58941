//! The connection manager: handshake, reconnect, liveness, and the
//! strictly sequential request/response exchange.
//!
//! ## Concurrency
//!
//! The transport handle lives in one `tokio::sync::Mutex`. Every connect
//! attempt and every in-flight exchange holds that lock, so there is never
//! more than one outstanding request or one reconnect at a time. `stop()`
//! never takes the lock to interrupt a sleeping liveness iteration — the
//! cancellation token does that — so a request in progress cannot deadlock
//! shutdown.
//!
//! ## Bounded resend
//!
//! When the transport closes mid-exchange, `submit` reconnects and resends
//! exactly once. A second failure surfaces as a connectivity error response:
//! the occasional spurious failure is the price of an upper bound on
//! duplicate side effects (a note created twice, say).

use std::sync::Arc;

use notewire_core::ids::{ClientId, UserId};
use notewire_core::settings::ClientSettings;
use notewire_core::wire::{
    Action, Request, Response, WireMap, decode_response, encode_request,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ClientError;
use crate::transport::{Connector, Transport};

/// Error message when a connection could not be established at all.
pub const CONNECT_FAILED_MSG: &str = "Failed to connect to server";

/// Error message when the connection died mid-exchange and the single
/// resend did not recover it.
pub const CONNECTION_LOST_MSG: &str = "Connection to server lost";

/// Client connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, nothing pending.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Handshake acknowledged; requests may flow.
    Connected,
    /// The transport died; a reconnect is pending.
    Degraded,
}

type TransportSlot = Option<Box<dyn Transport>>;

/// Owns the transport and the background liveness loop.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    client_id: ClientId,
    timing: ClientSettings,
    state: RwLock<ConnectionState>,
    transport: AsyncMutex<TransportSlot>,
    restore_user: RwLock<Option<UserId>>,
    shutdown: CancellationToken,
    liveness: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// A manager with a fresh connection identity.
    pub fn new(connector: Arc<dyn Connector>, timing: ClientSettings) -> Self {
        Self {
            connector,
            client_id: ClientId::generate(),
            timing,
            state: RwLock::new(ConnectionState::Disconnected),
            transport: AsyncMutex::new(None),
            restore_user: RwLock::new(None),
            shutdown: CancellationToken::new(),
            liveness: Mutex::new(None),
        }
    }

    /// The identity this process presents on every handshake.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Arm (or disarm) session restoration for subsequent handshakes.
    ///
    /// Set by the facade on login success, cleared on logout.
    pub fn set_authenticated(&self, user: Option<UserId>) {
        *self.restore_user.write() = user;
    }

    /// One blocking handshake attempt; on success the background liveness
    /// loop is launched. On failure the state remains `Disconnected` and no
    /// retry is scheduled.
    pub async fn start(self: &Arc<Self>) -> Result<(), ClientError> {
        if self.shutdown.is_cancelled() {
            return Err(ClientError::Stopped);
        }
        if self.liveness.lock().is_some() {
            return Err(ClientError::AlreadyStarted);
        }

        {
            let mut slot = self.transport.lock().await;
            self.connect_locked(&mut slot).await?;
        }

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move { manager.liveness_loop().await });
        *self.liveness.lock() = Some(handle);
        Ok(())
    }

    /// Send one request and wait for its response.
    ///
    /// Never returns without a terminal outcome: connectivity failures come
    /// back as `{status: error}` responses rather than faults.
    pub async fn submit(&self, action: Action, fields: WireMap) -> Response {
        if self.shutdown.is_cancelled() {
            return Response::error(CONNECT_FAILED_MSG);
        }
        let mut slot = self.transport.lock().await;
        if slot.is_none() && self.connect_locked(&mut slot).await.is_err() {
            return Response::error(CONNECT_FAILED_MSG);
        }

        let request = Request {
            action,
            request_id: Some(format!("req_{}", Uuid::now_v7())),
            fields,
        };
        let frame = encode_request(&request);

        for attempt in 0..2u8 {
            let Some(transport) = slot.as_mut() else {
                break;
            };
            let exchange = async {
                transport.send(&frame).await?;
                transport.recv().await
            }
            .await;

            match exchange {
                Ok(raw) => match decode_response(&raw) {
                    Ok(resp) => return resp,
                    Err(err) => {
                        warn!(action = %action, error = %err, "unreadable server response");
                        return Response::error("Invalid server response");
                    }
                },
                Err(err) => {
                    warn!(action = %action, attempt, error = %err, "transport failed mid-exchange");
                    if let Some(mut dead) = slot.take() {
                        dead.close().await;
                    }
                    if attempt == 0 {
                        // Exactly one reconnect-and-resend; a second send
                        // could duplicate a side-effecting operation.
                        *self.state.write() = ConnectionState::Degraded;
                        if self.connect_locked(&mut slot).await.is_err() {
                            return Response::error(CONNECTION_LOST_MSG);
                        }
                    } else {
                        *self.state.write() = ConnectionState::Disconnected;
                    }
                }
            }
        }
        Response::error(CONNECTION_LOST_MSG)
    }

    /// Stop the liveness loop, close the transport, drop the session state.
    ///
    /// Idempotent. Cancels a sleeping liveness iteration promptly and never
    /// starts another connect attempt afterwards.
    pub async fn stop(&self) {
        self.shutdown.cancel();

        let handle = self.liveness.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                debug!(error = %err, "liveness task ended abnormally");
            }
        }

        let mut slot = self.transport.lock().await;
        if let Some(mut transport) = slot.take() {
            transport.close().await;
        }
        *self.state.write() = ConnectionState::Disconnected;
        info!(client = %self.client_id, "connection manager stopped");
    }

    /// One connect + handshake attempt against the slot the caller holds.
    ///
    /// On success the slot holds the fresh transport and the state is
    /// `Connected`; on any failure the slot is empty and the state is
    /// `Disconnected`.
    async fn connect_locked(&self, slot: &mut TransportSlot) -> Result<(), ClientError> {
        if let Some(mut old) = slot.take() {
            old.close().await;
        }
        *self.state.write() = ConnectionState::Connecting;

        let mut transport = match self.connector.connect().await {
            Ok(transport) => transport,
            Err(err) => {
                debug!(error = %err, "connect failed");
                *self.state.write() = ConnectionState::Disconnected;
                return Err(ClientError::Connect);
            }
        };

        let frame = encode_request(&self.handshake_request());
        let reply = async {
            transport.send(&frame).await?;
            transport.recv().await
        }
        .await;

        let raw = match reply {
            Ok(raw) => raw,
            Err(err) => {
                debug!(error = %err, "handshake exchange failed");
                transport.close().await;
                *self.state.write() = ConnectionState::Disconnected;
                return Err(ClientError::Connect);
            }
        };

        match decode_response(&raw) {
            Ok(resp) if resp.is_connected() => {
                *slot = Some(transport);
                *self.state.write() = ConnectionState::Connected;
                info!(client = %self.client_id, "connected");
                Ok(())
            }
            Ok(resp) => {
                warn!(status = resp.status.as_str(), message = %resp.message, "handshake rejected");
                transport.close().await;
                *self.state.write() = ConnectionState::Disconnected;
                Err(ClientError::HandshakeRejected(resp.message))
            }
            Err(err) => {
                transport.close().await;
                *self.state.write() = ConnectionState::Disconnected;
                Err(ClientError::Protocol(err))
            }
        }
    }

    /// The init/restore message opening every connection.
    fn handshake_request(&self) -> Request {
        match self.restore_user.read().clone() {
            Some(user) => Request::new(Action::RestoreSession)
                .with_field("client_id", self.client_id.as_str())
                .with_field("user_id", user.as_str()),
            None => Request::new(Action::Init).with_field("client_id", self.client_id.as_str()),
        }
    }

    /// Background loop: probe while connected, reconnect while not.
    ///
    /// Runs until the cancellation token fires; transient failures never
    /// end it.
    async fn liveness_loop(self: Arc<Self>) {
        debug!(client = %self.client_id, "liveness loop started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if self.state() == ConnectionState::Connected {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.timing.ping_interval()) => {}
                }

                let mut slot = self.transport.lock().await;
                if self.shutdown.is_cancelled() {
                    break;
                }
                let Some(transport) = slot.as_mut() else {
                    continue;
                };
                if let Err(err) = transport.probe().await {
                    warn!(error = %err, "liveness probe failed");
                    if let Some(mut dead) = slot.take() {
                        dead.close().await;
                    }
                    *self.state.write() = ConnectionState::Degraded;
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        result = self.connect_locked(&mut slot) => {
                            if result.is_err() {
                                debug!("reconnect after failed probe did not succeed");
                            }
                        }
                    }
                }
            } else {
                let mut slot = self.transport.lock().await;
                if self.shutdown.is_cancelled() {
                    break;
                }
                let reconnect = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    result = self.connect_locked(&mut slot) => result,
                };
                drop(slot);
                if reconnect.is_err() {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.timing.reconnect_delay()) => {}
                    }
                }
            }
        }
        debug!(client = %self.client_id, "liveness loop stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
