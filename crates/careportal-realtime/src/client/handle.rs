use std::fmt;
use std::sync::Weak;

use super::Inner;

/// Returned by a successful subscribe.
///
/// Dropping the handle does not unsubscribe. [`unsubscribe`](Self::unsubscribe)
/// only affects the subscription this handle was issued for; once the
/// destination has been re-subscribed it is a no-op.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: String,
    destination: String,
    client: Weak<Inner>,
}

impl SubscriptionHandle {
    pub(super) fn new(id: String, destination: &str, client: Weak<Inner>) -> Self {
        Self {
            id,
            destination: destination.to_string(),
            client,
        }
    }

    /// Transport subscription id (`sub-N`).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Whether the registry still holds this exact subscription.
    pub fn is_active(&self) -> bool {
        self.client
            .upgrade()
            .is_some_and(|inner| inner.has_subscription(&self.destination, &self.id))
    }

    pub fn unsubscribe(self) {
        if let Some(inner) = self.client.upgrade() {
            inner.unsubscribe(&self.destination, Some(&self.id));
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .finish()
    }
}
