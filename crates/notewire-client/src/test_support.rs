//! Scripted transport fakes for manager and facade tests.
//!
//! A `FakeConnector` hands out pre-scripted `FakeTransport`s (or connect
//! failures) in order and counts connect attempts, which is how the tests
//! verify the bounded-retry behavior.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use notewire_core::wire::{Response, encode_response};
use parking_lot::Mutex;

use crate::transport::{Connector, Transport, TransportError};

/// The encoded handshake acknowledgement.
pub(crate) fn connected_frame() -> String {
    encode_response(&Response::connected("Connected"))
}

/// An encoded success response with the given message.
pub(crate) fn success_frame(message: &str) -> String {
    encode_response(&Response::success(message))
}

/// A transport that answers `recv` from a scripted reply queue.
///
/// An exhausted queue reads as the remote closing the connection. Probes
/// succeed unless a failure was armed.
pub(crate) struct FakeTransport {
    sent: Arc<Mutex<Vec<String>>>,
    replies: Mutex<VecDeque<String>>,
    probe_failures: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new(replies: Vec<String>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            replies: Mutex::new(replies.into()),
            probe_failures: AtomicUsize::new(0),
        }
    }

    /// Every frame passed to `send`, shared with the test.
    pub(crate) fn sent_frames(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }

    /// Make the next probe report a dead connection.
    pub(crate) fn fail_next_probe(&self) {
        let _ = self.probe_failures.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.sent.lock().push(frame.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        self.replies
            .lock()
            .pop_front()
            .ok_or(TransportError::Closed)
    }

    async fn probe(&mut self) -> Result<(), TransportError> {
        if self.probe_failures.load(Ordering::SeqCst) > 0 {
            let _ = self.probe_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    async fn close(&mut self) {}
}

/// Hands out scripted outcomes per connect attempt, counting them.
pub(crate) struct FakeConnector {
    script: Mutex<VecDeque<Option<FakeTransport>>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
        }
    }

    /// Queue a successful connect yielding `transport`.
    pub(crate) fn push_transport(&self, transport: FakeTransport) {
        self.script.lock().push_back(Some(transport));
    }

    /// Queue a failed connect attempt.
    pub(crate) fn push_failure(&self) {
        self.script.lock().push_back(None);
    }

    /// Number of connect attempts observed so far.
    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let _ = self.connects.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(Some(transport)) => Ok(Box::new(transport)),
            Some(None) | None => Err(TransportError::Connect("scripted refusal".to_string())),
        }
    }
}
