//! The realtime messaging client.
//!
//! [`RealtimeClient`] owns at most one broker connection, a registry of
//! destination subscriptions, and the reconnect schedule. `connect` is the
//! only awaited operation; everything else is synchronous and never fails
//! loudly: without a live connection, `subscribe`/`send` log a warning and
//! return.

mod handle;
mod portal;
mod reconnect;
mod registry;
mod types;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::error::{RealtimeError, TransportError};
use crate::transport::{
    ConnectRequest, Connection, Connector, EventStream, TransportEvent, WebSocketConnector,
};
use registry::{Entry, SubscriptionRegistry};

pub use handle::SubscriptionHandle;
pub use reconnect::ReconnectState;
pub use types::{ClientConfig, ConnectionState, CredentialProvider, MessageCallback};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle to the realtime connection. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<ConnectionState>,
}

struct Shared {
    connection: Option<Arc<dyn Connection>>,
    /// Bumped by every connect attempt and by `disconnect`. Tasks and
    /// handshakes tagged with an older value are stale.
    generation: u64,
    registry: SubscriptionRegistry,
    reconnect: ReconnectState,
    /// Credential passed to the most recent `connect`.
    credential: Option<String>,
    provider: Option<Arc<dyn CredentialProvider>>,
    reconnect_task: Option<AbortHandle>,
    event_task: Option<AbortHandle>,
}

impl RealtimeClient {
    /// Client that talks STOMP over WebSocket.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let reconnect =
            ReconnectState::new(config.reconnect_base_delay, config.max_reconnect_attempts);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                shared: Mutex::new(Shared {
                    connection: None,
                    generation: 0,
                    registry: SubscriptionRegistry::new(),
                    reconnect,
                    credential: None,
                    provider: None,
                    reconnect_task: None,
                    event_task: None,
                }),
                state_tx,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Use `provider` for the credential of automatic reconnects.
    pub fn set_credential_provider(&self, provider: impl CredentialProvider + 'static) {
        self.inner.lock().provider = Some(Arc::new(provider));
    }

    // -- Lifecycle --------------------------------------------------------

    /// Open the broker connection using `credential` as bearer token.
    ///
    /// Returns immediately if already connected. If another attempt is in
    /// flight, waits for its outcome instead of opening a second connection.
    pub async fn connect(&self, credential: impl Into<String>) -> Result<(), RealtimeError> {
        Arc::clone(&self.inner).connect(credential.into()).await
    }

    /// Tear everything down: subscriptions, connection, pending reconnect.
    /// Messages that arrive afterwards are discarded. Idempotent.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    // -- Messaging --------------------------------------------------------

    /// Subscribe `callback` to `destination`, replacing any previous
    /// subscription for it. `None` without a live connection.
    pub fn subscribe<F>(&self, destination: &str, callback: F) -> Option<SubscriptionHandle>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.inner.subscribe(destination, Arc::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe) but decodes each payload into `T`.
    /// Payloads of the wrong shape are logged and dropped.
    pub fn subscribe_as<T, F>(&self, destination: &str, callback: F) -> Option<SubscriptionHandle>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let topic = destination.to_string();
        self.subscribe(destination, move |value| {
            match serde_json::from_value::<T>(value) {
                Ok(decoded) => callback(decoded),
                Err(e) => warn!(destination = %topic, error = %e, "Dropping message with unexpected shape"),
            }
        })
    }

    /// Remove the subscription for `destination`, if any.
    pub fn unsubscribe(&self, destination: &str) {
        self.inner.unsubscribe(destination, None);
    }

    /// Serialize `message` as JSON and publish it to `destination`.
    pub fn send<T>(&self, destination: &str, message: &T)
    where
        T: Serialize + ?Sized,
    {
        let connection = self.inner.lock().connection.clone();
        let Some(connection) = connection else {
            warn!(destination = %destination, "Cannot send: not connected");
            return;
        };
        let body = match serde_json::to_string(message) {
            Ok(body) => body,
            Err(e) => {
                warn!(destination = %destination, error = %e, "Failed to serialize message");
                return;
            }
        };
        if let Err(e) = connection.send(destination, body) {
            warn!(destination = %destination, error = %e, "Failed to send message");
        }
    }

    // -- Introspection ----------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connection.is_some()
    }

    /// Reconnect attempts made since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().reconnect.attempts()
    }

    /// Registered destinations, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.lock().registry.destinations()
    }

    pub fn is_subscribed(&self, destination: &str) -> bool {
        self.inner.lock().registry.contains(destination)
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("endpoint", &self.inner.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// State Machine
// ---------------------------------------------------------------------------

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    // Boxed so the reconnect task can call back into `connect`.
    fn connect(self: Arc<Self>, credential: String) -> BoxFuture<'static, Result<(), RealtimeError>> {
        Box::pin(async move {
            if credential.is_empty() {
                return Err(RealtimeError::MissingCredential);
            }

            let generation = {
                let mut shared = self.lock();
                if shared.connection.is_some() {
                    return Ok(());
                }
                if *self.state_tx.borrow() == ConnectionState::Connecting {
                    None
                } else {
                    shared.generation += 1;
                    shared.credential = Some(credential.clone());
                    if let Some(pending) = shared.reconnect_task.take() {
                        pending.abort();
                    }
                    self.set_state(ConnectionState::Connecting);
                    Some(shared.generation)
                }
            };
            let Some(generation) = generation else {
                return self.wait_for_attempt().await;
            };

            let request = ConnectRequest {
                endpoint: self.config.endpoint.clone(),
                credential,
                heartbeat: self.config.heartbeat,
                timeout: self.config.connect_timeout,
            };
            info!(endpoint = %self.config.endpoint, "Connecting to message broker");

            // The attempt runs on its own task so it settles even if the
            // caller stops polling; later callers wait on its outcome.
            let inner = Arc::clone(&self);
            let attempt = tokio::spawn(async move {
                match inner.connector.open(&request).await {
                    Ok((connection, events)) => inner.on_connected(generation, connection, events),
                    Err(e) => inner.on_connect_failed(generation, e),
                }
            });
            match attempt.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Connect attempt aborted");
                    self.on_attempt_lost(generation);
                    Err(RealtimeError::Cancelled)
                }
            }
        })
    }

    /// The attempt task died without settling; release the `connecting` state.
    fn on_attempt_lost(&self, generation: u64) {
        let shared = self.lock();
        if shared.generation == generation && shared.connection.is_none() {
            self.set_state(ConnectionState::Failed);
        }
    }

    /// Wait for someone else's attempt to settle.
    async fn wait_for_attempt(&self) -> Result<(), RealtimeError> {
        let mut state_rx = self.state_tx.subscribe();
        let state = match state_rx
            .wait_for(|state| *state != ConnectionState::Connecting)
            .await
        {
            Ok(state) => *state,
            Err(_) => ConnectionState::Disconnected,
        };
        match state {
            ConnectionState::Connected => Ok(()),
            other => Err(RealtimeError::ConcurrentAttemptFailed(other)),
        }
    }

    fn on_connected(
        self: &Arc<Self>,
        generation: u64,
        connection: Arc<dyn Connection>,
        events: EventStream,
    ) -> Result<(), RealtimeError> {
        let mut shared = self.lock();
        if shared.generation != generation {
            drop(shared);
            debug!("Discarding connection opened after disconnect");
            connection.close();
            return Err(RealtimeError::Cancelled);
        }

        // Subscriptions outlive unexpected drops; restore them with their ids.
        for (destination, id) in shared.registry.entries() {
            if let Err(e) = connection.subscribe(&id, &destination) {
                warn!(destination = %destination, error = %e, "Failed to restore subscription");
            }
        }

        shared.reconnect.reset();
        shared.connection = Some(connection);
        let pump = tokio::spawn(Arc::clone(self).pump_events(generation, events));
        if let Some(previous) = shared.event_task.replace(pump.abort_handle()) {
            previous.abort();
        }
        self.set_state(ConnectionState::Connected);
        info!(
            endpoint = %self.config.endpoint,
            subscriptions = shared.registry.len(),
            "Connected to message broker"
        );
        Ok(())
    }

    fn on_connect_failed(
        self: &Arc<Self>,
        generation: u64,
        err: TransportError,
    ) -> Result<(), RealtimeError> {
        let mut shared = self.lock();
        if shared.generation != generation {
            return Err(RealtimeError::Cancelled);
        }
        self.set_state(ConnectionState::Failed);
        error!(error = %err, "Failed to connect to message broker");
        if err.is_transport_level() {
            self.schedule_reconnect(&mut shared);
        }
        Err(RealtimeError::Connect(err))
    }

    /// The established connection went away without `disconnect`.
    fn on_dropped(self: &Arc<Self>, generation: u64, reason: &str) {
        let connection = {
            let mut shared = self.lock();
            if shared.generation != generation || shared.connection.is_none() {
                return;
            }
            let connection = shared.connection.take();
            shared.event_task = None;
            self.set_state(ConnectionState::Disconnected);
            warn!(reason = %reason, "Lost connection to message broker");
            self.schedule_reconnect(&mut shared);
            connection
        };
        if let Some(connection) = connection {
            connection.close();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, shared: &mut Shared) {
        let Some(delay) = shared.reconnect.next_delay() else {
            error!(
                attempts = shared.reconnect.attempts(),
                "Reconnect attempts exhausted; call connect to retry"
            );
            return;
        };
        let attempt = shared.reconnect.attempts();
        info!(
            attempt,
            max_attempts = shared.reconnect.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        let task = tokio::spawn(Arc::clone(self).run_reconnect(shared.generation, attempt, delay));
        if let Some(previous) = shared.reconnect_task.replace(task.abort_handle()) {
            previous.abort();
        }
    }

    async fn run_reconnect(self: Arc<Self>, generation: u64, attempt: u32, delay: Duration) {
        tokio::time::sleep(delay).await;

        let (provider, stored) = {
            let mut shared = self.lock();
            if shared.generation != generation {
                return;
            }
            // Detach so the attempt below does not abort its own task.
            shared.reconnect_task = None;
            (shared.provider.clone(), shared.credential.clone())
        };
        let credential = match provider {
            Some(provider) => provider.bearer_token(),
            None => stored,
        };
        let Some(credential) = credential.filter(|c| !c.is_empty()) else {
            warn!(attempt, "No credential available; abandoning reconnect");
            return;
        };

        info!(attempt, "Reconnecting to message broker");
        if let Err(e) = self.connect(credential).await {
            debug!(attempt, error = %e, "Reconnect attempt failed");
        }
    }

    async fn pump_events(self: Arc<Self>, generation: u64, mut events: EventStream) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Message {
                    subscription,
                    destination,
                    body,
                } => self.deliver(generation, &subscription, &destination, &body),
                TransportEvent::Error(message) => {
                    warn!(error = %message, "Broker reported an error");
                    self.on_dropped(generation, &message);
                    return;
                }
                TransportEvent::Closed { reason } => {
                    self.on_dropped(generation, &reason);
                    return;
                }
            }
        }
        self.on_dropped(generation, "event stream ended");
    }

    /// Decode first, then look the callback up immediately before invoking
    /// it. The lock is not held across the call so callbacks can re-enter
    /// the client; an `unsubscribe` racing from another thread can still
    /// overlap with a callback that has already started.
    fn deliver(&self, generation: u64, subscription: &str, destination: &str, body: &str) {
        let value = match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(e) => {
                warn!(destination = %destination, error = %e, "Dropping malformed message payload");
                return;
            }
        };
        let callback = {
            let shared = self.lock();
            if shared.generation != generation {
                return;
            }
            shared.registry.callback_for(subscription, destination)
        };
        match callback {
            Some(callback) => callback(value),
            None => {
                debug!(destination = %destination, subscription = %subscription, "No subscriber for message")
            }
        }
    }

    fn disconnect(&self) {
        let (connection, reconnect_task, event_task) = {
            let mut shared = self.lock();
            shared.generation += 1;
            shared.registry.clear();
            shared.credential = None;
            (
                shared.connection.take(),
                shared.reconnect_task.take(),
                shared.event_task.take(),
            )
        };
        if let Some(task) = reconnect_task {
            task.abort();
        }
        if let Some(task) = event_task {
            task.abort();
        }
        if let Some(connection) = connection {
            connection.close();
            info!("Disconnected from message broker");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    // -- Subscriptions ----------------------------------------------------

    fn subscribe(
        self: &Arc<Self>,
        destination: &str,
        callback: MessageCallback,
    ) -> Option<SubscriptionHandle> {
        let mut shared = self.lock();
        let Some(connection) = shared.connection.clone() else {
            warn!(destination = %destination, "Cannot subscribe: not connected");
            return None;
        };

        let id = shared.registry.allocate_id();
        if let Err(e) = connection.subscribe(&id, destination) {
            warn!(destination = %destination, error = %e, "Failed to subscribe");
            return None;
        }
        let entry = Entry {
            id: id.clone(),
            callback,
        };
        if let Some(previous) = shared.registry.insert(destination, entry) {
            debug!(destination = %destination, replaced = %previous.id, "Replacing subscription");
            if let Err(e) = connection.unsubscribe(&previous.id) {
                debug!(destination = %destination, error = %e, "Failed to drop replaced subscription");
            }
        }
        debug!(destination = %destination, id = %id, "Subscribed");
        Some(SubscriptionHandle::new(id, destination, Arc::downgrade(self)))
    }

    /// Remove the entry for `destination`; with `only_id`, only if it still
    /// carries that id.
    fn unsubscribe(&self, destination: &str, only_id: Option<&str>) {
        let mut shared = self.lock();
        let removed = match only_id {
            Some(id) => shared.registry.remove_if_id(destination, id),
            None => shared.registry.remove(destination),
        };
        let Some(entry) = removed else {
            return;
        };
        if let Some(connection) = &shared.connection {
            if let Err(e) = connection.unsubscribe(&entry.id) {
                debug!(destination = %destination, error = %e, "Failed to unsubscribe");
            }
        }
        debug!(destination = %destination, id = %entry.id, "Unsubscribed");
    }

    fn has_subscription(&self, destination: &str, id: &str) -> bool {
        self.lock()
            .registry
            .entries()
            .iter()
            .any(|(d, i)| d == destination && i == id)
    }
}
