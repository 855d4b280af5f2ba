//! Minimal STOMP 1.2 codec.
//!
//! Only what a subscribing client needs: frame encode/decode with header
//! escaping, and heart-beat negotiation. One WebSocket text message carries
//! exactly one frame (or a bare EOL heartbeat).

mod frame;
mod heartbeat;

pub use frame::{Command, Frame, FrameError};
pub use heartbeat::{HeartBeat, NegotiatedHeartBeat};
