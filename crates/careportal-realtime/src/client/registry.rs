//! Destination-keyed subscription registry.

use std::collections::HashMap;

use super::types::MessageCallback;

/// One registered subscription.
#[derive(Clone)]
pub(crate) struct Entry {
    /// Transport subscription id (`sub-N`), unique for the client's lifetime.
    pub(crate) id: String,
    pub(crate) callback: MessageCallback,
}

/// Maps each destination to at most one live subscription.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    entries: HashMap<String, Entry>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&mut self) -> String {
        let id = format!("sub-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Register `entry`, returning the one it replaced.
    pub(crate) fn insert(&mut self, destination: &str, entry: Entry) -> Option<Entry> {
        self.entries.insert(destination.to_string(), entry)
    }

    pub(crate) fn remove(&mut self, destination: &str) -> Option<Entry> {
        self.entries.remove(destination)
    }

    /// Remove only if the current entry still carries `id`.
    pub(crate) fn remove_if_id(&mut self, destination: &str, id: &str) -> Option<Entry> {
        match self.entries.get(destination) {
            Some(entry) if entry.id == id => self.entries.remove(destination),
            _ => None,
        }
    }

    /// Callback for an inbound MESSAGE, matched on both id and destination.
    pub(crate) fn callback_for(&self, subscription: &str, destination: &str) -> Option<MessageCallback> {
        if let Some(entry) = self.entries.get(destination) {
            if entry.id == subscription {
                return Some(entry.callback.clone());
            }
        }
        // Brokers may rewrite the destination header (e.g. user destinations).
        self.entries
            .values()
            .find(|entry| entry.id == subscription)
            .map(|entry| entry.callback.clone())
    }

    pub(crate) fn contains(&self, destination: &str) -> bool {
        self.entries.contains_key(destination)
    }

    /// `(destination, id)` pairs, sorted by destination.
    pub(crate) fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(destination, entry)| (destination.clone(), entry.id.clone()))
            .collect();
        entries.sort();
        entries
    }

    pub(crate) fn destinations(&self) -> Vec<String> {
        self.entries().into_iter().map(|(d, _)| d).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
