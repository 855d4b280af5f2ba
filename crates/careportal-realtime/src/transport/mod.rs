//! Transport seam between [`crate::RealtimeClient`] and the broker.
//!
//! A [`Connector`] performs the handshake and hands back a live
//! [`Connection`] plus a stream of [`TransportEvent`]s. The client never
//! touches sockets directly, so tests can swap in an in-memory broker.

mod websocket;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::stomp::HeartBeat;

pub use websocket::WebSocketConnector;

// ---------------------------------------------------------------------------
// Request / Events
// ---------------------------------------------------------------------------

/// Everything a connector needs to open one connection.
#[derive(Clone)]
pub struct ConnectRequest {
    pub endpoint: String,
    /// Bearer token sent as `Authorization` on the CONNECT frame.
    pub credential: String,
    pub heartbeat: HeartBeat,
    pub timeout: Duration,
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("endpoint", &self.endpoint)
            .field("credential", &"[REDACTED]")
            .field("heartbeat", &self.heartbeat)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Something the broker did after the handshake completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A MESSAGE frame for one of our subscriptions.
    Message {
        subscription: String,
        destination: String,
        body: String,
    },
    /// The broker sent an ERROR frame on the established session.
    Error(String),
    /// The connection is gone (socket closed, I/O error, heartbeat timeout).
    Closed { reason: String },
}

/// Inbound events for one connection. Ends after `Closed`.
pub type EventStream = mpsc::Receiver<TransportEvent>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Opens broker connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        request: &ConnectRequest,
    ) -> Result<(Arc<dyn Connection>, EventStream), TransportError>;
}

/// A live broker connection. All methods are non-blocking: frames are queued
/// for a background writer.
pub trait Connection: Send + Sync {
    fn subscribe(&self, id: &str, destination: &str) -> Result<(), TransportError>;
    fn unsubscribe(&self, id: &str) -> Result<(), TransportError>;
    fn send(&self, destination: &str, body: String) -> Result<(), TransportError>;
    /// Graceful teardown. Idempotent; no events are delivered afterwards.
    fn close(&self);
}
