use serde::{Deserialize, Serialize};

use crate::client::ConnectionState;
use crate::protocol::{ChatMessage, PortalNotification, TypingIndicator};
use crate::topics::UserRole;

/// Toast shown when the realtime connection cannot be established.
pub const CONNECTION_LOST_TOAST: &str = "Connection lost. Some features may not work properly.";

/// The logged-in portal account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Role name as issued by the auth service (`PATIENT`, `doctor`, ...).
    #[serde(default)]
    pub role: Option<String>,
}

impl PortalUser {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            role: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Unknown or missing roles are treated as patients.
    pub fn user_role(&self) -> UserRole {
        UserRole::from_role_name(self.role.as_deref())
    }

    /// `senderType` value for outgoing chat messages.
    pub fn sender_type(&self) -> &'static str {
        match self.user_role() {
            UserRole::Patient => "PATIENT",
            UserRole::Doctor => "DOCTOR",
            UserRole::Admin => "ADMIN",
        }
    }
}

/// Connection status as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl From<ConnectionState> for SessionStatus {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Disconnected => SessionStatus::Disconnected,
            ConnectionState::Connecting => SessionStatus::Connecting,
            ConnectionState::Connected => SessionStatus::Connected,
            ConnectionState::Failed => SessionStatus::Error,
        }
    }
}

/// Events emitted by [`super::PortalSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    Notification(PortalNotification),
    /// A message from someone else in an open conversation.
    ChatMessage {
        conversation_id: i64,
        message: ChatMessage,
    },
    /// A message from someone else on an emergency channel.
    EmergencyMessage {
        channel_id: i64,
        message: ChatMessage,
    },
    /// Another participant started or stopped typing.
    Typing(TypingIndicator),
}
