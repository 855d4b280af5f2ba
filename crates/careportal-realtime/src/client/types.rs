//! Types shared by the realtime client and its collaborators.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use careportal_config::RealtimeSettings;
use serde::{Deserialize, Serialize};

use crate::stomp::HeartBeat;

// ---------------------------------------------------------------------------
// Connection State
// ---------------------------------------------------------------------------

/// Lifecycle of the client's broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime configuration for [`super::RealtimeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket URL of the STOMP broker.
    pub endpoint: String,
    /// Heart-beat we ask for in the CONNECT frame.
    pub heartbeat: HeartBeat,
    /// Delay before the first reconnect attempt; doubles per attempt.
    pub reconnect_base_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8080/ws".into(),
            heartbeat: HeartBeat::new(4000, 4000),
            reconnect_base_delay: Duration::from_millis(1000),
            max_reconnect_attempts: 5,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&RealtimeSettings> for ClientConfig {
    fn from(settings: &RealtimeSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            heartbeat: HeartBeat::new(
                settings.heartbeat_outgoing_ms,
                settings.heartbeat_incoming_ms,
            ),
            reconnect_base_delay: Duration::from_millis(u64::from(
                settings.reconnect_base_delay_ms,
            )),
            max_reconnect_attempts: settings.max_reconnect_attempts,
            connect_timeout: Duration::from_secs(u64::from(settings.connect_timeout_secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Delivery callback for a subscription. Receives the decoded JSON body.
pub type MessageCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Supplies the bearer token used for automatic reconnects.
///
/// Read at retry time so a token refreshed in the meantime is picked up.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn bearer_token(&self) -> Option<String> {
        self()
    }
}
