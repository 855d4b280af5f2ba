//! End-to-end tests against a minimal in-process STOMP broker.

use std::time::Duration;

use careportal_realtime::stomp::{Command, Frame, HeartBeat};
use careportal_realtime::transport::{ConnectRequest, Connector, TransportEvent, WebSocketConnector};
use careportal_realtime::{ClientConfig, ConnectionState, RealtimeClient, RealtimeError, TransportError};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(5);

type ServerSocket = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, endpoint)
}

/// Accept one WebSocket connection, agreeing to STOMP 1.2.
async fn accept_stomp(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    let negotiate = |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
        let offered = req
            .headers()
            .get("Sec-WebSocket-Protocol")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(offered.contains("v12.stomp"), "offered: {offered}");
        resp.headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("v12.stomp"));
        Ok(resp)
    };
    tokio_tungstenite::accept_hdr_async(stream, negotiate)
        .await
        .unwrap()
}

/// Next non-heartbeat frame from the client.
async fn next_frame(ws: &mut ServerSocket) -> Frame {
    loop {
        let msg = ws.next().await.expect("client went away").unwrap();
        if let Message::Text(text) = msg {
            if let Some(frame) = Frame::decode(text.as_str()).unwrap() {
                return frame;
            }
        }
    }
}

async fn send_frame(ws: &mut ServerSocket, frame: Frame) {
    ws.send(Message::Text(frame.encode().into())).await.unwrap();
}

fn connected_frame(heart_beat: &str) -> Frame {
    Frame::new(Command::Connected)
        .with_header("version", "1.2")
        .with_header("heart-beat", heart_beat)
}

fn config(endpoint: &str, heartbeat: HeartBeat) -> ClientConfig {
    ClientConfig {
        endpoint: endpoint.to_string(),
        heartbeat,
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn client_round_trip_over_websocket() {
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_stomp(&listener).await;

        let connect = next_frame(&mut ws).await;
        send_frame(&mut ws, connected_frame("0,0")).await;

        let subscribe = next_frame(&mut ws).await;
        let sub_id = subscribe.header("id").unwrap().to_string();
        send_frame(
            &mut ws,
            Frame::new(Command::Message)
                .with_header("subscription", sub_id)
                .with_header("destination", "/topic/chat/42")
                .with_header("message-id", "m-1")
                .with_body(r#"{"id":1,"messageContent":"hello"}"#),
        )
        .await;

        let send = next_frame(&mut ws).await;
        let disconnect = next_frame(&mut ws).await;
        (connect, subscribe, send, disconnect)
    });

    let client = RealtimeClient::new(config(&endpoint, HeartBeat::new(0, 0)));
    client.connect("test-token").await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let (tx, mut rx) = mpsc::channel(8);
    client
        .subscribe_to_conversation(42, move |value| {
            let _ = tx.try_send(value);
        })
        .unwrap();

    let received = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(received, json!({"id": 1, "messageContent": "hello"}));

    client.send_chat_message(42, &json!({"messageContent": "reply", "senderId": 5}));
    client.disconnect();

    let (connect, subscribe, send, disconnect) = timeout(WAIT, server).await.unwrap().unwrap();

    assert_eq!(connect.command, Command::Connect);
    assert_eq!(connect.header("accept-version"), Some("1.2,1.1,1.0"));
    assert_eq!(connect.header("host"), Some("127.0.0.1"));
    assert_eq!(connect.header("heart-beat"), Some("0,0"));
    assert_eq!(connect.header("Authorization"), Some("Bearer test-token"));

    assert_eq!(subscribe.command, Command::Subscribe);
    assert_eq!(subscribe.header("destination"), Some("/topic/chat/42"));

    assert_eq!(send.command, Command::Send);
    assert_eq!(send.header("destination"), Some("/app/chat.send"));
    assert_eq!(send.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(&send.body).unwrap();
    assert_eq!(
        body,
        json!({"conversationId": 42, "messageContent": "reply", "senderId": 5})
    );

    assert_eq!(disconnect.command, Command::Disconnect);
    assert!(disconnect.header("receipt").unwrap().starts_with("disconnect-"));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn broker_error_during_handshake_rejects_connect() {
    let (listener, endpoint) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept_stomp(&listener).await;
        let _connect = next_frame(&mut ws).await;
        send_frame(
            &mut ws,
            Frame::new(Command::Error)
                .with_header("message", "Invalid token")
                .with_body("JWT expired"),
        )
        .await;
    });

    let client = RealtimeClient::new(config(&endpoint, HeartBeat::new(0, 0)));
    let err = timeout(WAIT, client.connect("stale")).await.unwrap().unwrap_err();

    assert_eq!(
        err,
        RealtimeError::Connect(TransportError::Rejected("Invalid token".into()))
    );
    assert_eq!(client.state(), ConnectionState::Failed);
    assert_eq!(client.reconnect_attempts(), 0);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    // Bind then drop to get a port nobody listens on.
    let (listener, endpoint) = bind().await;
    drop(listener);

    let request = ConnectRequest {
        endpoint,
        credential: "token".into(),
        heartbeat: HeartBeat::new(0, 0),
        timeout: WAIT,
    };
    let err = WebSocketConnector.open(&request).await.err().unwrap();

    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn silent_broker_is_treated_as_dropped() {
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_stomp(&listener).await;
        let _connect = next_frame(&mut ws).await;
        // Promise a heartbeat every 100ms, then never send one.
        send_frame(&mut ws, connected_frame("100,0")).await;
        tokio::time::sleep(WAIT).await;
        drop(ws);
    });

    let request = ConnectRequest {
        endpoint,
        credential: "token".into(),
        heartbeat: HeartBeat::new(0, 100),
        timeout: WAIT,
    };
    let (_connection, mut events) = WebSocketConnector.open(&request).await.unwrap();

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    match event {
        TransportEvent::Closed { reason } => assert!(reason.contains("heartbeat"), "{reason}"),
        other => panic!("unexpected event: {other:?}"),
    }
    server.abort();
}

#[tokio::test]
async fn client_sends_heartbeats() {
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_stomp(&listener).await;
        let _connect = next_frame(&mut ws).await;
        // Ask for a heartbeat from the client every 100ms.
        send_frame(&mut ws, connected_frame("0,100")).await;
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) if text.as_str() == "\n" => return true,
                Some(Ok(_)) => continue,
                _ => return false,
            }
        }
    });

    let request = ConnectRequest {
        endpoint,
        credential: "token".into(),
        heartbeat: HeartBeat::new(100, 0),
        timeout: WAIT,
    };
    let (connection, _events) = WebSocketConnector.open(&request).await.unwrap();

    assert!(timeout(WAIT, server).await.unwrap().unwrap());
    connection.close();
}
