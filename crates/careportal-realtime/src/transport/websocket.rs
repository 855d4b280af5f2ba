//! STOMP over a tokio-tungstenite WebSocket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, Uri};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ConnectRequest, Connection, Connector, EventStream, TransportEvent};
use crate::error::TransportError;
use crate::stomp::{Command, Frame, FrameError, HeartBeat};

const SUBPROTOCOLS: &str = "v12.stomp, v11.stomp, v10.stomp";
const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Opens STOMP sessions over WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(
        &self,
        request: &ConnectRequest,
    ) -> Result<(Arc<dyn Connection>, EventStream), TransportError> {
        match tokio::time::timeout(request.timeout, handshake(request)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(timeout = ?request.timeout, "STOMP handshake timed out");
                Err(TransportError::Timeout(request.timeout))
            }
        }
    }
}

async fn handshake(
    request: &ConnectRequest,
) -> Result<(Arc<dyn Connection>, EventStream), TransportError> {
    let mut ws_request = request
        .endpoint
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Network(e.to_string()))?;
    ws_request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOLS));

    let (ws_stream, _) = tokio_tungstenite::connect_async(ws_request)
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let connect = Frame::new(Command::Connect)
        .with_header("accept-version", ACCEPT_VERSION)
        .with_header("host", virtual_host(&request.endpoint))
        .with_header("heart-beat", request.heartbeat.header_value())
        .with_header("Authorization", format!("Bearer {}", request.credential));
    ws_write
        .send(WsMessage::Text(connect.encode().into()))
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let connected = await_connected(&mut ws_read).await?;
    let server_beat = connected
        .header("heart-beat")
        .and_then(HeartBeat::parse)
        .unwrap_or_default();
    let agreed = request.heartbeat.negotiate(&server_beat);
    info!(
        version = connected.header("version").unwrap_or("1.0"),
        send_every = ?agreed.send_every,
        expect_every = ?agreed.expect_every,
        "STOMP session established"
    );

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(256);
    tokio::spawn(writer_task(ws_write, outbound_rx, agreed.send_every));
    let reader = tokio::spawn(reader_task(ws_read, event_tx, agreed.silence_timeout()));

    let connection = WebSocketConnection {
        outbound: outbound_tx,
        closed: AtomicBool::new(false),
        reader: reader.abort_handle(),
    };
    Ok((Arc::new(connection), event_rx))
}

/// Read until the broker answers CONNECT.
async fn await_connected<S>(ws_read: &mut S) -> Result<Frame, TransportError>
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = ws_read.next().await {
        let text = match msg {
            Ok(WsMessage::Text(text)) => text.as_str().to_owned(),
            Ok(WsMessage::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
            Ok(WsMessage::Close(frame)) => return Err(TransportError::Closed(close_reason(frame))),
            Ok(_) => continue,
            Err(e) => return Err(TransportError::Network(e.to_string())),
        };
        let frame = match Frame::decode(&text) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => return Err(TransportError::Network(format!("bad handshake frame: {e}"))),
        };
        match frame.command {
            Command::Connected => return Ok(frame),
            Command::Error => return Err(TransportError::Rejected(error_message(&frame))),
            other => debug!(command = %other, "Ignoring frame before CONNECTED"),
        }
    }
    Err(TransportError::Closed("stream ended during handshake".into()))
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

enum Outbound {
    Frame(Frame),
    Close,
}

struct WebSocketConnection {
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
    reader: AbortHandle,
}

impl WebSocketConnection {
    fn enqueue(&self, frame: Frame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed("connection closed locally".into()));
        }
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed("writer has stopped".into()))
    }
}

impl Connection for WebSocketConnection {
    fn subscribe(&self, id: &str, destination: &str) -> Result<(), TransportError> {
        self.enqueue(
            Frame::new(Command::Subscribe)
                .with_header("id", id)
                .with_header("destination", destination)
                .with_header("ack", "auto"),
        )
    }

    fn unsubscribe(&self, id: &str) -> Result<(), TransportError> {
        self.enqueue(Frame::new(Command::Unsubscribe).with_header("id", id))
    }

    fn send(&self, destination: &str, body: String) -> Result<(), TransportError> {
        self.enqueue(
            Frame::new(Command::Send)
                .with_header("destination", destination)
                .with_header("content-type", "application/json")
                .with_header("content-length", body.len().to_string())
                .with_body(body),
        )
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Stop delivering before the broker sees DISCONNECT.
        self.reader.abort();
        let receipt = format!("disconnect-{}", Uuid::new_v4());
        let disconnect = Frame::new(Command::Disconnect).with_header("receipt", receipt);
        let _ = self.outbound.send(Outbound::Frame(disconnect));
        let _ = self.outbound.send(Outbound::Close);
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

async fn writer_task<S>(
    mut ws_write: S,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    send_every: Option<Duration>,
) where
    S: Sink<WsMessage> + Unpin,
{
    let mut heartbeat = send_every.map(|every| {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let next = match heartbeat.as_mut() {
            Some(interval) => tokio::select! {
                msg = outbound.recv() => msg,
                _ = interval.tick() => {
                    if ws_write.send(WsMessage::Text("\n".into())).await.is_err() {
                        break;
                    }
                    continue;
                }
            },
            None => outbound.recv().await,
        };

        match next {
            Some(Outbound::Frame(frame)) => {
                if ws_write
                    .send(WsMessage::Text(frame.encode().into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Some(Outbound::Close) => {
                let _ = ws_write.send(WsMessage::Close(None)).await;
                break;
            }
            None => {
                let _ = ws_write.close().await;
                break;
            }
        }
    }
    debug!("STOMP writer stopped");
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

async fn reader_task<S>(
    mut ws_read: S,
    events: mpsc::Sender<TransportEvent>,
    silence_timeout: Option<Duration>,
) where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let reason = loop {
        let next = match silence_timeout {
            Some(limit) => match tokio::time::timeout(limit, ws_read.next()).await {
                Ok(next) => next,
                Err(_elapsed) => break format!("no heartbeat from broker within {limit:?}"),
            },
            None => ws_read.next().await,
        };

        let text = match next {
            Some(Ok(WsMessage::Text(text))) => text.as_str().to_owned(),
            Some(Ok(WsMessage::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
            Some(Ok(WsMessage::Close(frame))) => break close_reason(frame),
            // Ping/pong still count as traffic for the silence check.
            Some(Ok(_)) => continue,
            Some(Err(e)) => break format!("websocket error: {e}"),
            None => break "stream ended".to_string(),
        };

        match inbound_event(&text) {
            Ok(Some(event)) => {
                if events.send(event).await.is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Dropping undecodable STOMP frame"),
        }
    };

    info!(reason = %reason, "STOMP connection closed");
    let _ = events.send(TransportEvent::Closed { reason }).await;
}

/// Map one inbound text message to a client-visible event.
fn inbound_event(text: &str) -> Result<Option<TransportEvent>, FrameError> {
    let Some(frame) = Frame::decode(text)? else {
        return Ok(None);
    };
    let event = match frame.command {
        Command::Message => TransportEvent::Message {
            subscription: frame.header("subscription").unwrap_or_default().to_string(),
            destination: frame.header("destination").unwrap_or_default().to_string(),
            body: frame.body,
        },
        Command::Error => TransportEvent::Error(error_message(&frame)),
        other => {
            debug!(command = %other, "Ignoring STOMP frame");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn error_message(frame: &Frame) -> String {
    match frame.header("message") {
        Some(message) if !message.is_empty() => message.to_string(),
        _ if !frame.body.is_empty() => frame.body.clone(),
        _ => "unspecified broker error".to_string(),
    }
}

fn close_reason(frame: Option<CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!(
                "closed by broker ({}): {}",
                u16::from(frame.code),
                frame.reason.as_str()
            )
        }
        Some(frame) => format!("closed by broker ({})", u16::from(frame.code)),
        None => "closed by broker".to_string(),
    }
}

/// STOMP `host` header: the endpoint's host name.
fn virtual_host(endpoint: &str) -> String {
    endpoint
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}
