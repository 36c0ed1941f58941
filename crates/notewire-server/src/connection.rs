//! Per-connection loop: handshake, then strictly sequential
//! decode → dispatch → respond until the transport closes.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use notewire_core::ids::ClientId;
use notewire_core::wire::{Response, WireValue, decode_request, encode_response};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info};

use crate::dispatch::Dispatcher;

/// The server side of an accepted WebSocket.
pub type WsStream = WebSocketStream<TcpStream>;

/// Drive one client connection to completion.
///
/// The first frame is the handshake: it supplies (or omits, in which case
/// the server generates) the connection identity, which is registered
/// before any other action is accepted. After that, exactly one request is
/// read and answered at a time — a malformed frame gets an error response
/// and the loop continues; only transport closure or a failed send ends it.
/// On exit the registry forgets the connection and every binding to it.
pub async fn serve_connection(
    mut ws: WsStream,
    remote_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
) {
    let registry = Arc::clone(&dispatcher.context().registry);

    let Some(first) = next_text(&mut ws).await else {
        debug!(addr = %remote_addr, "connection closed before handshake");
        return;
    };
    let first = match decode_request(&first) {
        Ok(req) => req,
        Err(err) => {
            debug!(addr = %remote_addr, error = %err, "malformed handshake frame");
            let _ = send_response(&mut ws, &Response::error(err.to_string())).await;
            return;
        }
    };

    let client_id = first
        .field("client_id")
        .and_then(WireValue::as_str)
        .map(ClientId::new)
        .unwrap_or_else(ClientId::generate);
    registry.register(client_id.clone(), remote_addr);
    info!(client = %client_id, addr = %remote_addr, "client connected");

    let response = dispatcher.dispatch(&first, &client_id).await;
    let mut healthy = send_response(&mut ws, &response).await.is_ok();

    while healthy {
        let Some(frame) = next_text(&mut ws).await else {
            break;
        };
        let response = match decode_request(&frame) {
            Ok(req) => dispatcher.dispatch(&req, &client_id).await,
            Err(err) => {
                debug!(client = %client_id, error = %err, "malformed frame");
                Response::error(err.to_string())
            }
        };
        healthy = send_response(&mut ws, &response).await.is_ok();
    }

    registry.remove(&client_id);
    registry.on_disconnect(&client_id);
    info!(client = %client_id, "client disconnected");
}

/// Read the next text frame, answering pings inline.
async fn next_text(ws: &mut WsStream) -> Option<String> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Ping(payload)) => {
                if ws.send(Message::Pong(payload)).await.is_err() {
                    return None;
                }
            }
            Ok(Message::Close(_)) => return None,
            // Pong / Binary / raw frames carry nothing for this protocol.
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "websocket read failed");
                return None;
            }
        }
    }
}

async fn send_response(ws: &mut WsStream, resp: &Response) -> Result<(), tungstenite::Error> {
    ws.send(Message::Text(encode_response(resp).into())).await
}
