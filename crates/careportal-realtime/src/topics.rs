//! Broker destination names used by the portal.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application destinations handled by the backend.
pub mod destinations {
    pub const CHAT_SEND: &str = "/app/chat.send";
    pub const CHAT_TYPING: &str = "/app/chat.typing";
}

pub fn conversation_topic(conversation_id: impl fmt::Display) -> String {
    format!("/topic/chat/{conversation_id}")
}

/// Blood-group emergency chat rooms.
pub fn emergency_channel_topic(channel_id: impl fmt::Display) -> String {
    format!("/topic/blood-group-chat/{channel_id}")
}

pub fn user_notifications_topic(user_id: impl fmt::Display, role: UserRole) -> String {
    format!("/topic/notifications/{}/{user_id}", role.topic_segment())
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Portal account role. Serialized the way the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[default]
    Patient,
    Doctor,
    Admin,
}

impl UserRole {
    /// Lowercase name used in topic paths.
    pub fn topic_segment(self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Doctor => "doctor",
            UserRole::Admin => "admin",
        }
    }

    /// Case-insensitive parse of a known role name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "patient" => Some(UserRole::Patient),
            "doctor" => Some(UserRole::Doctor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Missing roles are patients. Unrecognised ones are too, with a warning,
    /// since they would land on the patient notification topic.
    pub fn from_role_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return UserRole::Patient;
        };
        Self::parse(name).unwrap_or_else(|| {
            warn!(role = %name, "Unrecognised role; using patient notifications");
            UserRole::Patient
        })
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_segment())
    }
}
