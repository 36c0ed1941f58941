//! Transport abstraction over the wire connection.
//!
//! The manager only needs connect / send / receive / probe / close, so the
//! WebSocket details live behind these traits and tests drive the manager
//! with scripted fakes that count connect attempts.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to connect: {0}")]
    Connect(String),

    /// The remote closed the connection.
    #[error("connection closed")]
    Closed,

    /// Any other I/O failure on an open connection.
    #[error("transport error: {0}")]
    Io(String),

    /// A liveness probe was not acknowledged in time.
    #[error("liveness probe timed out")]
    ProbeTimeout,
}

/// An open, bidirectional, ordered text-frame connection.
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Receive the next text frame; [`TransportError::Closed`] when the
    /// remote closed.
    async fn recv(&mut self) -> Result<String, TransportError>;

    /// Lightweight liveness check of a supposedly idle connection.
    async fn probe(&mut self) -> Result<(), TransportError>;

    /// Close the connection; best-effort, bounded.
    async fn close(&mut self);
}

/// Dials new [`Transport`] instances.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a fresh connection.
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Production connector dialing `ws://host:port`.
pub struct WsConnector {
    url: String,
    close_timeout: Duration,
}

impl WsConnector {
    /// A connector for the given `ws://` URL.
    pub fn new(url: impl Into<String>, close_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            close_timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(Box::new(WsTransport {
            stream,
            close_timeout: self.close_timeout,
        }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    close_timeout: Duration,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Err(TransportError::Closed),
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Ping(payload))) => {
                    self.stream
                        .send(Message::Pong(payload))
                        .await
                        .map_err(map_ws_error)?;
                }
                Some(Ok(Message::Close(_))) => return Err(TransportError::Closed),
                // Pong / binary frames carry nothing for this protocol.
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(map_ws_error(err)),
            }
        }
    }

    async fn probe(&mut self) -> Result<(), TransportError> {
        self.stream
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(map_ws_error)?;

        let deadline = self.close_timeout;
        let wait_for_pong = async {
            loop {
                match self.stream.next().await {
                    None => return Err(TransportError::Closed),
                    Some(Ok(Message::Pong(_))) => return Ok(()),
                    Some(Ok(Message::Ping(payload))) => {
                        self.stream
                            .send(Message::Pong(payload))
                            .await
                            .map_err(map_ws_error)?;
                    }
                    Some(Ok(Message::Close(_))) => return Err(TransportError::Closed),
                    Some(Ok(other)) => {
                        // A text frame here would be a stale reply from an
                        // abandoned exchange; the protocol is strictly
                        // sequential, so it is dropped, not delivered.
                        debug!(frame = ?other, "unexpected frame during probe");
                    }
                    Some(Err(err)) => return Err(map_ws_error(err)),
                }
            }
        };
        match tokio::time::timeout(deadline, wait_for_pong).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ProbeTimeout),
        }
    }

    async fn close(&mut self) {
        let _ = tokio::time::timeout(self.close_timeout, self.stream.close(None)).await;
    }
}

fn map_ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Io(other.to_string()),
    }
}
