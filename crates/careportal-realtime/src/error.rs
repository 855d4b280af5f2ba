use std::time::Duration;

use crate::client::ConnectionState;

/// Failure reported by a transport while opening or running a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The broker answered the handshake with a protocol-level error.
    #[error("broker rejected connection: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("connection closed: {0}")]
    Closed(String),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Transport-level failures are retried; broker rejections are not.
    pub fn is_transport_level(&self) -> bool {
        !matches!(self, TransportError::Rejected(_))
    }
}

/// Error returned by [`crate::RealtimeClient::connect`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    #[error("a non-empty credential is required to connect")]
    MissingCredential,

    #[error("connection failed: {0}")]
    Connect(#[from] TransportError),

    #[error("connection attempt cancelled by disconnect")]
    Cancelled,

    #[error("concurrent connection attempt ended in state {0}")]
    ConcurrentAttemptFailed(ConnectionState),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_not_transport_level() {
        assert!(!TransportError::Rejected("bad token".into()).is_transport_level());
        assert!(TransportError::Network("refused".into()).is_transport_level());
        assert!(TransportError::Closed("eof".into()).is_transport_level());
        assert!(TransportError::Timeout(Duration::from_secs(15)).is_transport_level());
    }

    #[test]
    fn realtime_error_display() {
        let err: RealtimeError = TransportError::Rejected("bad token".into()).into();
        assert_eq!(
            err.to_string(),
            "connection failed: broker rejected connection: bad token"
        );

        let err = RealtimeError::ConcurrentAttemptFailed(ConnectionState::Failed);
        assert_eq!(
            err.to_string(),
            "concurrent connection attempt ended in state failed"
        );
    }
}
