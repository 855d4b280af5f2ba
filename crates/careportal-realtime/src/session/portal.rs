use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use careportal_common::{Toast, ToastQueue};
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::types::{PortalUser, SessionEvent, SessionStatus, CONNECTION_LOST_TOAST};
use crate::chat::ConversationHistory;
use crate::client::{ConnectionState, RealtimeClient};
use crate::error::RealtimeError;
use crate::protocol::{ChatEvent, ChatMessage, PortalNotification};
use crate::topics;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owns the realtime client for the duration of a login.
pub struct PortalSession {
    client: RealtimeClient,
    shared: Arc<Mutex<SessionState>>,
    events: mpsc::Sender<SessionEvent>,
    status_task: AbortHandle,
}

struct SessionState {
    user: Option<PortalUser>,
    token: Option<String>,
    status: SessionStatus,
    toasts: ToastQueue,
    history: ConversationHistory,
}

fn lock(shared: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if let Err(mpsc::error::TrySendError::Full(event)) = events.try_send(event) {
        warn!(?event, "Session event channel full; dropping event");
    }
}

fn update_status(
    shared: &Mutex<SessionState>,
    events: &mpsc::Sender<SessionEvent>,
    status: SessionStatus,
) {
    let changed = {
        let mut state = lock(shared);
        let changed = state.status != status;
        state.status = status;
        changed
    };
    if changed {
        emit(events, SessionEvent::StatusChanged(status));
    }
}

impl PortalSession {
    /// Create a session around `client`. Returns `(session, event_receiver)`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(client: RealtimeClient) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let shared = Arc::new(Mutex::new(SessionState {
            user: None,
            token: None,
            status: SessionStatus::Disconnected,
            toasts: ToastQueue::default(),
            history: ConversationHistory::default(),
        }));

        let status_task = tokio::spawn(track_connection(
            client.watch_state(),
            Arc::clone(&shared),
            event_tx.clone(),
        ));

        let session = Self {
            client,
            shared,
            events: event_tx,
            status_task: status_task.abort_handle(),
        };
        (session, event_rx)
    }

    pub fn client(&self) -> &RealtimeClient {
        &self.client
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.shared).status
    }

    pub fn user(&self) -> Option<PortalUser> {
        lock(&self.shared).user.clone()
    }

    // -- Lifecycle --------------------------------------------------------

    /// Connect as `user` and subscribe to their notifications.
    ///
    /// On failure the status becomes `error` and a warning toast is queued.
    pub async fn login(
        &self,
        user: PortalUser,
        token: impl Into<String>,
    ) -> Result<(), RealtimeError> {
        let token = token.into();
        {
            let mut state = lock(&self.shared);
            state.user = Some(user.clone());
            state.token = Some(token.clone());
        }
        self.set_status(SessionStatus::Connecting);

        match self.client.connect(token).await {
            Ok(()) => {
                self.set_status(SessionStatus::Connected);
                self.subscribe_notifications(&user);
                info!(user_id = user.id, role = %user.user_role(), "Session started");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to start realtime session");
                self.set_status(SessionStatus::Error);
                lock(&self.shared).toasts.push(Toast::warning(CONNECTION_LOST_TOAST));
                Err(e)
            }
        }
    }

    /// Disconnect and forget the user.
    pub fn logout(&self) {
        self.client.disconnect();
        {
            let mut state = lock(&self.shared);
            state.user = None;
            state.token = None;
            state.history.clear_all();
        }
        self.set_status(SessionStatus::Disconnected);
        info!("Session ended");
    }

    /// Run the login flow again with the stored user and token.
    pub async fn reconnect(&self) -> Result<(), RealtimeError> {
        let stored = {
            let state = lock(&self.shared);
            state.user.clone().zip(state.token.clone())
        };
        match stored {
            Some((user, token)) => self.login(user, token).await,
            None => Err(RealtimeError::MissingCredential),
        }
    }

    // -- Chat -------------------------------------------------------------

    /// Start receiving a conversation's messages and typing indicators.
    pub fn open_conversation(&self, conversation_id: i64) -> bool {
        let Some(user_id) = self.user().map(|u| u.id) else {
            warn!(conversation_id, "Cannot open conversation: not logged in");
            return false;
        };
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let topic = topics::conversation_topic(conversation_id);
        self.client
            .subscribe_as(&topic, move |event: ChatEvent| match event {
                ChatEvent::Typing(typing) => {
                    if typing.user_id != user_id {
                        emit(&events, SessionEvent::Typing(typing));
                    }
                }
                ChatEvent::Message(message) => {
                    // Own messages were recorded when sent.
                    if message.sender_id == Some(user_id) {
                        return;
                    }
                    let fresh = lock(&shared).history.push(conversation_id, message.clone());
                    if fresh {
                        emit(
                            &events,
                            SessionEvent::ChatMessage {
                                conversation_id,
                                message,
                            },
                        );
                    } else {
                        debug!(conversation_id, id = ?message.id, "Ignoring duplicate chat message");
                    }
                }
            })
            .is_some()
    }

    pub fn close_conversation(&self, conversation_id: i64) {
        self.client
            .unsubscribe(&topics::conversation_topic(conversation_id));
    }

    /// Join a blood-group emergency channel.
    pub fn open_emergency_channel(&self, channel_id: i64) -> bool {
        let Some(user_id) = self.user().map(|u| u.id) else {
            warn!(channel_id, "Cannot open emergency channel: not logged in");
            return false;
        };
        let events = self.events.clone();
        let topic = topics::emergency_channel_topic(channel_id);
        self.client
            .subscribe_as(&topic, move |message: ChatMessage| {
                if message.sender_id != Some(user_id) {
                    emit(&events, SessionEvent::EmergencyMessage { channel_id, message });
                }
            })
            .is_some()
    }

    pub fn close_emergency_channel(&self, channel_id: i64) {
        self.client
            .unsubscribe(&topics::emergency_channel_topic(channel_id));
    }

    /// Send `content` to a conversation as the logged-in user and clear the
    /// typing indicator. Returns `false` if it could not be sent.
    pub fn send_chat_message(&self, conversation_id: i64, content: &str) -> bool {
        let Some(user) = self.user() else {
            warn!(conversation_id, "Cannot send chat message: not logged in");
            return false;
        };
        if !self.client.is_connected() {
            warn!(conversation_id, "Cannot send chat message: not connected");
            return false;
        }

        let mut message = ChatMessage::outgoing(user.id, user.sender_type(), content.trim());
        message.sender_name = user.name.clone();
        self.client.send_chat_message(conversation_id, &message);
        self.client
            .send_typing_indicator(conversation_id, user.id, false);
        lock(&self.shared).history.push(conversation_id, message);
        true
    }

    pub fn set_typing(&self, conversation_id: i64, is_typing: bool) {
        if let Some(user) = self.user() {
            self.client
                .send_typing_indicator(conversation_id, user.id, is_typing);
        }
    }

    /// The most recent `limit` messages of a conversation, oldest first.
    pub fn recent_messages(&self, conversation_id: i64, limit: usize) -> Vec<ChatMessage> {
        lock(&self.shared)
            .history
            .recent(conversation_id, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    // -- Toasts -----------------------------------------------------------

    /// Remove and return every queued toast.
    pub fn take_toasts(&self) -> Vec<Toast> {
        lock(&self.shared).toasts.drain()
    }

    // -- Internals --------------------------------------------------------

    fn set_status(&self, status: SessionStatus) {
        update_status(&self.shared, &self.events, status);
    }

    fn subscribe_notifications(&self, user: &PortalUser) {
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let topic = topics::user_notifications_topic(user.id, user.user_role());
        let subscribed = self
            .client
            .subscribe_as(&topic, move |notification: PortalNotification| {
                if let Some(text) = notification.text() {
                    lock(&shared).toasts.push(Toast::info(text));
                }
                emit(&events, SessionEvent::Notification(notification));
            });
        if subscribed.is_none() {
            warn!(topic = %topic, "Could not subscribe to notifications");
        }
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        self.status_task.abort();
    }
}

/// Mirror background connection changes (drops, reconnects) into the
/// session status.
async fn track_connection(
    mut state_rx: watch::Receiver<ConnectionState>,
    shared: Arc<Mutex<SessionState>>,
    events: mpsc::Sender<SessionEvent>,
) {
    while state_rx.changed().await.is_ok() {
        let state = *state_rx.borrow_and_update();
        update_status(&shared, &events, SessionStatus::from(state));
    }
}
