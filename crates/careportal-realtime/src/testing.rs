//! In-memory broker used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::{ConnectRequest, Connection, Connector, EventStream, TransportEvent};

/// What the next `open` call does.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Accept,
    /// Broker answers with an ERROR frame.
    Reject(String),
    /// Socket-level failure.
    Fail(String),
}

pub(crate) struct FakeConnector {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    open_delay: Option<Duration>,
    opens: Mutex<Vec<(Instant, String)>>,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeConnector {
    pub(crate) fn accepting() -> Arc<Self> {
        Arc::new(Self::new(Vec::new(), Outcome::Accept, None))
    }

    pub(crate) fn scripted(script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self::new(script, fallback, None))
    }

    /// Every `open` takes `delay` before resolving.
    pub(crate) fn slow(delay: Duration) -> Arc<Self> {
        Self::scripted_slow(Vec::new(), Outcome::Accept, delay)
    }

    pub(crate) fn scripted_slow(script: Vec<Outcome>, fallback: Outcome, delay: Duration) -> Arc<Self> {
        Arc::new(Self::new(script, fallback, Some(delay)))
    }

    fn new(script: Vec<Outcome>, fallback: Outcome, open_delay: Option<Duration>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            open_delay,
            opens: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    /// When each `open` started.
    pub(crate) fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    /// Gaps between consecutive `open` calls.
    pub(crate) fn open_gaps(&self) -> Vec<Duration> {
        self.open_times().windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub(crate) fn credentials(&self) -> Vec<String> {
        self.opens.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub(crate) fn connection(&self, index: usize) -> Arc<FakeConnection> {
        Arc::clone(&self.connections.lock().unwrap()[index])
    }

    pub(crate) fn last_connection(&self) -> Arc<FakeConnection> {
        let connections = self.connections.lock().unwrap();
        Arc::clone(connections.last().expect("no connection was accepted"))
    }

    pub(crate) fn accepted_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        request: &ConnectRequest,
    ) -> Result<(Arc<dyn Connection>, EventStream), TransportError> {
        self.opens
            .lock()
            .unwrap()
            .push((Instant::now(), request.credential.clone()));
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match outcome {
            Outcome::Accept => {
                let (tx, rx) = mpsc::channel(64);
                let connection = Arc::new(FakeConnection::new(tx));
                self.connections.lock().unwrap().push(Arc::clone(&connection));
                Ok((connection, rx))
            }
            Outcome::Reject(message) => Err(TransportError::Rejected(message)),
            Outcome::Fail(message) => Err(TransportError::Network(message)),
        }
    }
}

/// Records everything the client does with a connection and lets tests
/// inject broker traffic.
pub(crate) struct FakeConnection {
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    subscriptions: Mutex<Vec<(String, String)>>,
    unsubscribed: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, Value)>>,
    closed: AtomicBool,
}

impl FakeConnection {
    fn new(events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            events: Mutex::new(Some(events)),
            subscriptions: Mutex::new(Vec::new()),
            unsubscribed: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn push_event(&self, event: TransportEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.try_send(event);
        }
    }

    /// Broker publishes `body` on `destination` for whichever subscription
    /// currently targets it.
    pub(crate) fn deliver(&self, destination: &str, body: &str) {
        let subscription = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|(_, d)| d == destination)
            .map(|(id, _)| id.clone())
            .unwrap_or_default();
        self.deliver_raw(&subscription, destination, body);
    }

    pub(crate) fn deliver_raw(&self, subscription: &str, destination: &str, body: &str) {
        self.push_event(TransportEvent::Message {
            subscription: subscription.to_string(),
            destination: destination.to_string(),
            body: body.to_string(),
        });
    }

    /// Socket goes away underneath the client.
    pub(crate) fn drop_connection(&self, reason: &str) {
        self.push_event(TransportEvent::Closed {
            reason: reason.to_string(),
        });
        self.events.lock().unwrap().take();
    }

    pub(crate) fn broker_error(&self, message: &str) {
        self.push_event(TransportEvent::Error(message.to_string()));
    }

    /// `(id, destination)` pairs currently subscribed, sorted by destination.
    pub(crate) fn active_subscriptions(&self) -> Vec<(String, String)> {
        let mut subs = self.subscriptions.lock().unwrap().clone();
        subs.sort_by(|a, b| a.1.cmp(&b.1));
        subs
    }

    pub(crate) fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::Closed("fake connection closed".into()))
        } else {
            Ok(())
        }
    }
}

impl Connection for FakeConnection {
    fn subscribe(&self, id: &str, destination: &str) -> Result<(), TransportError> {
        self.check_open()?;
        self.subscriptions
            .lock()
            .unwrap()
            .push((id.to_string(), destination.to_string()));
        Ok(())
    }

    fn unsubscribe(&self, id: &str) -> Result<(), TransportError> {
        self.check_open()?;
        self.subscriptions.lock().unwrap().retain(|(i, _)| i != id);
        self.unsubscribed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    fn send(&self, destination: &str, body: String) -> Result<(), TransportError> {
        self.check_open()?;
        let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), value));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.events.lock().unwrap().take();
    }
}

/// Let spawned tasks run. Advances paused time by 1ms.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
