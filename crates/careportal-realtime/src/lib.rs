//! Realtime messaging for the CarePortal client.
//!
//! A STOMP-over-WebSocket client that owns a single broker connection,
//! keeps a registry of per-destination subscriptions, and reconnects with
//! bounded exponential backoff. The transport sits behind the
//! [`transport::Connector`] trait so the client can run against an
//! in-memory broker in tests.
//!
//! [`session::PortalSession`] layers the portal's login/logout lifecycle,
//! notification toasts, and chat bookkeeping on top of [`RealtimeClient`].

pub mod chat;
pub mod client;
mod error;
pub mod protocol;
pub mod session;
pub mod stomp;
pub mod topics;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ConversationHistory, ConversationHistoryConfig};
pub use client::{
    ClientConfig, ConnectionState, CredentialProvider, RealtimeClient, ReconnectState,
    SubscriptionHandle,
};
pub use error::{RealtimeError, TransportError};
pub use protocol::{ChatMessage, PortalNotification, TypingIndicator};
pub use session::{PortalSession, PortalUser, SessionEvent, SessionStatus};
pub use topics::UserRole;
