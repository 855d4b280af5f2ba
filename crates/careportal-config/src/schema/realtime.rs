use serde::{Deserialize, Serialize};

/// Realtime (STOMP over WebSocket) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// WebSocket URL of the message broker.
    pub endpoint: String,
    /// Requested interval for heartbeats from the broker, in ms (0 disables).
    pub heartbeat_incoming_ms: u32,
    /// Interval at which we send heartbeats, in ms (0 disables).
    pub heartbeat_outgoing_ms: u32,
    /// Delay before the first reconnect attempt, in ms. Doubles per attempt.
    pub reconnect_base_delay_ms: u32,
    /// Automatic reconnect attempts before giving up (valid range: 0-20).
    pub max_reconnect_attempts: u32,
    /// Handshake timeout in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8080/ws".into(),
            heartbeat_incoming_ms: 4000,
            heartbeat_outgoing_ms: 4000,
            reconnect_base_delay_ms: 1000,
            max_reconnect_attempts: 5,
            connect_timeout_secs: 15,
        }
    }
}
