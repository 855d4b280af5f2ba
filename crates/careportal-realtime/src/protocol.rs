//! JSON payloads exchanged with the portal backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat message as broadcast on `/topic/chat/{id}` and the emergency
/// channels. Every field is optional on the wire except the text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
    #[serde(default, alias = "content")]
    pub message_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    /// `PATIENT` or `DOCTOR` as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

impl ChatMessage {
    /// Outbound message from `sender_id`.
    pub fn outgoing(sender_id: i64, sender_type: &str, content: impl Into<String>) -> Self {
        Self {
            message_content: content.into(),
            sender_id: Some(sender_id),
            sender_type: Some(sender_type.to_string()),
            ..Self::default()
        }
    }
}

/// `{conversationId, userId, isTyping}` sent to `/app/chat.typing` and
/// echoed back on the conversation topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub conversation_id: i64,
    pub user_id: i64,
    pub is_typing: bool,
}

/// Anything that arrives on a conversation topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatEvent {
    Typing(TypingIndicator),
    Message(ChatMessage),
}

/// Payload for `/app/chat.send`: `conversationId` followed by the message's
/// own fields, which take precedence. Non-object messages go under `content`.
pub fn chat_send_payload<T>(conversation_id: i64, message: &T) -> Result<Value, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut payload = Map::new();
    payload.insert("conversationId".into(), Value::from(conversation_id));
    match serde_json::to_value(message)? {
        Value::Object(fields) => payload.extend(fields),
        Value::Null => {}
        other => {
            payload.insert("content".into(), other);
        }
    }
    Ok(Value::Object(payload))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A per-user notification from `/topic/notifications/{role}/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortalNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PortalNotification {
    /// Text to show the user: `content`, falling back to `message`.
    pub fn text(&self) -> Option<&str> {
        [self.content.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
    }
}
