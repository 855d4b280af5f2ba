//! `heart-beat` header handling.

use std::time::Duration;

/// A `heart-beat:<cx>,<cy>` pair in milliseconds.
///
/// From the sender's point of view: `outgoing_ms` is the smallest interval at
/// which it can send, `incoming_ms` the interval it would like to receive at.
/// Zero means "cannot" / "does not want".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    pub outgoing_ms: u32,
    pub incoming_ms: u32,
}

/// Intervals agreed after the CONNECT/CONNECTED exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiatedHeartBeat {
    /// How often the client must send a heartbeat, if at all.
    pub send_every: Option<Duration>,
    /// How often the broker promised to send something, if at all.
    pub expect_every: Option<Duration>,
}

impl NegotiatedHeartBeat {
    /// Silence on the wire longer than this means the connection is dead.
    pub fn silence_timeout(&self) -> Option<Duration> {
        self.expect_every.map(|d| d * 2)
    }
}

impl HeartBeat {
    pub fn new(outgoing_ms: u32, incoming_ms: u32) -> Self {
        Self {
            outgoing_ms,
            incoming_ms,
        }
    }

    pub fn header_value(&self) -> String {
        format!("{},{}", self.outgoing_ms, self.incoming_ms)
    }

    /// Parse a header value. Malformed values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let (out, inc) = value.split_once(',')?;
        Some(Self {
            outgoing_ms: out.trim().parse().ok()?,
            incoming_ms: inc.trim().parse().ok()?,
        })
    }

    /// Combine the client's request (`self`) with the broker's answer.
    pub fn negotiate(&self, server: &HeartBeat) -> NegotiatedHeartBeat {
        NegotiatedHeartBeat {
            send_every: agreed(self.outgoing_ms, server.incoming_ms),
            expect_every: agreed(self.incoming_ms, server.outgoing_ms),
        }
    }
}

fn agreed(a: u32, b: u32) -> Option<Duration> {
    if a == 0 || b == 0 {
        None
    } else {
        Some(Duration::from_millis(u64::from(a.max(b))))
    }
}
