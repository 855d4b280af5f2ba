//! Portal-specific wrappers over subscribe/send.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{RealtimeClient, SubscriptionHandle};
use crate::protocol::{chat_send_payload, TypingIndicator};
use crate::topics::{self, destinations, UserRole};

impl RealtimeClient {
    /// Subscribe to messages in a doctor/patient conversation.
    pub fn subscribe_to_conversation<F>(
        &self,
        conversation_id: i64,
        callback: F,
    ) -> Option<SubscriptionHandle>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.subscribe(&topics::conversation_topic(conversation_id), callback)
    }

    /// Subscribe to a blood-group emergency channel.
    pub fn subscribe_to_emergency_channel<F>(
        &self,
        channel_id: i64,
        callback: F,
    ) -> Option<SubscriptionHandle>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.subscribe(&topics::emergency_channel_topic(channel_id), callback)
    }

    pub fn subscribe_to_user_notifications<F>(
        &self,
        user_id: i64,
        role: UserRole,
        callback: F,
    ) -> Option<SubscriptionHandle>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.subscribe(&topics::user_notifications_topic(user_id, role), callback)
    }

    /// Publish `message` to a conversation. The payload is the message's
    /// fields plus `conversationId`.
    pub fn send_chat_message<T>(&self, conversation_id: i64, message: &T)
    where
        T: Serialize + ?Sized,
    {
        match chat_send_payload(conversation_id, message) {
            Ok(payload) => self.send(destinations::CHAT_SEND, &payload),
            Err(e) => warn!(conversation_id, error = %e, "Failed to serialize chat message"),
        }
    }

    pub fn send_typing_indicator(&self, conversation_id: i64, user_id: i64, is_typing: bool) {
        let indicator = TypingIndicator {
            conversation_id,
            user_id,
            is_typing,
        };
        self.send(destinations::CHAT_TYPING, &indicator);
    }
}
