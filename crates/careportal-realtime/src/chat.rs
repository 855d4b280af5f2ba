//! Per-conversation chat history.
//!
//! Messages are kept in a bounded ring buffer per conversation so memory use
//! stays predictable. Messages carrying an id are stored at most once.

use std::collections::{HashMap, VecDeque};

use crate::protocol::ChatMessage;

/// Configuration for chat history storage.
#[derive(Debug, Clone)]
pub struct ConversationHistoryConfig {
    /// Maximum messages to retain per conversation.
    pub max_messages_per_conversation: usize,
}

impl Default for ConversationHistoryConfig {
    fn default() -> Self {
        Self {
            max_messages_per_conversation: 500,
        }
    }
}

/// In-memory chat history, keyed by conversation id.
#[derive(Debug)]
pub struct ConversationHistory {
    config: ConversationHistoryConfig,
    conversations: HashMap<i64, VecDeque<ChatMessage>>,
}

impl ConversationHistory {
    pub fn new(config: ConversationHistoryConfig) -> Self {
        Self {
            config,
            conversations: HashMap::new(),
        }
    }

    /// Append a message. Returns `false` if a message with the same id is
    /// already stored. The oldest message is evicted when the buffer is full.
    pub fn push(&mut self, conversation_id: i64, msg: ChatMessage) -> bool {
        let buf = self.conversations.entry(conversation_id).or_default();
        if let Some(id) = msg.id {
            if buf.iter().any(|m| m.id == Some(id)) {
                return false;
            }
        }
        if buf.len() >= self.config.max_messages_per_conversation {
            buf.pop_front();
        }
        buf.push_back(msg);
        true
    }

    /// The most recent `limit` messages (oldest first).
    pub fn recent(&self, conversation_id: i64, limit: usize) -> Vec<&ChatMessage> {
        match self.conversations.get(&conversation_id) {
            Some(buf) => {
                let skip = buf.len().saturating_sub(limit);
                buf.iter().skip(skip).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn all(&self, conversation_id: i64) -> Vec<&ChatMessage> {
        match self.conversations.get(&conversation_id) {
            Some(buf) => buf.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn clear_conversation(&mut self, conversation_id: i64) {
        self.conversations.remove(&conversation_id);
    }

    pub fn clear_all(&mut self) {
        self.conversations.clear();
    }

    /// Conversations that have messages, sorted.
    pub fn active_conversations(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.conversations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn total_messages(&self) -> usize {
        self.conversations.values().map(|b| b.len()).sum()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(ConversationHistoryConfig::default())
    }
}
