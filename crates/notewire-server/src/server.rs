//! Listener accept loop: one task per connection.

use std::sync::Arc;
use std::time::Duration;

use notewire_store::{NoteCipher, NoteStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::serve_connection;
use crate::dispatch::{DispatchContext, Dispatcher};
use crate::registry::SessionRegistry;

/// The notewire server: registry, dispatcher, and the accept loop.
pub struct NoteServer {
    dispatcher: Arc<Dispatcher>,
}

impl NoteServer {
    /// Wire the dispatcher to its collaborators.
    pub fn new(store: Arc<NoteStore>, cipher: Arc<NoteCipher>) -> Self {
        let ctx = DispatchContext {
            store,
            cipher,
            registry: Arc::new(SessionRegistry::new()),
        };
        Self {
            dispatcher: Arc::new(Dispatcher::new(ctx)),
        }
    }

    /// The session registry (shared with every connection task).
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.dispatcher.context().registry)
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Connection tasks share only the dispatcher context; no ordering is
    /// guaranteed between requests arriving on different connections.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "server listening");
        }
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        let _ = tokio::spawn(async move {
                            match tokio_tungstenite::accept_async(stream).await {
                                Ok(ws) => serve_connection(ws, remote_addr, dispatcher).await,
                                Err(err) => {
                                    debug!(addr = %remote_addr, error = %err, "websocket accept failed");
                                }
                            }
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }
        info!("server stopped");
    }
}
