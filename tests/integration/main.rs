//! Causeway integration test harness.
//!
//! Each test starts an in-process relay on an OS-assigned loopback port and
//! talks to it over real WebSocket connections, exactly as a client would.
//! The relay's shared state is also held so tests can wait for the server
//! side to reach a known point instead of sleeping blindly.

use std::collections::HashSet;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use causeway_core::protocol::ServerMsg;
use causeway_relay::{Relay, RelayHandle, RelayState};


// ── Harness ───────────────────────────────────────────────────────────────────

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestRelay {
    pub addr: std::net::SocketAddr,
    pub state: RelayState,
    pub handle: RelayHandle,
    pub server: tokio::task::JoinHandle<anyhow::Result<()>>,
}

/// Bind a relay on 127.0.0.1:0 and start serving it in the background.
pub async fn start_relay() -> TestRelay {
    let relay = Relay::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = relay.local_addr().expect("local addr");
    let state = relay.state();
    let handle = relay.handle();
    let server = tokio::spawn(relay.serve());
    TestRelay {
        addr,
        state,
        handle,
        server,
    }
}

pub async fn open_introduction(relay: &TestRelay, id: &str) -> WsClient {
    connect(relay, &format!("/introduction/{id}")).await
}

pub async fn open_connection(relay: &TestRelay, from: &str, to: &str, key: &str) -> WsClient {
    connect(relay, &format!("/connection/{from}/{to}/{key}")).await
}

async fn connect(relay: &TestRelay, path: &str) -> WsClient {
    let url = format!("ws://{}{}", relay.addr, path);
    let (ws, _response) = connect_async(url).await.expect("websocket connect");
    ws
}

// ── Client-side helpers ───────────────────────────────────────────────────────

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string()))
        .await
        .expect("send text frame");
}

pub async fn send_binary(ws: &mut WsClient, bytes: &[u8]) {
    ws.send(Message::Binary(bytes.to_vec()))
        .await
        .expect("send binary frame");
}

/// Next data frame (text or binary), skipping transport noise.
/// Returns None when the server closed the connection.
pub async fn recv_data(ws: &mut WsClient) -> Option<Message> {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")?;
        match msg {
            Ok(m @ (Message::Text(_) | Message::Binary(_))) => return Some(m),
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return None,
        }
    }
}

pub async fn recv_binary(ws: &mut WsClient) -> Vec<u8> {
    match recv_data(ws).await.expect("connection closed") {
        Message::Binary(bytes) => bytes,
        other => panic!("expected binary frame, got {other:?}"),
    }
}

pub async fn recv_text_frame(ws: &mut WsClient) -> String {
    match recv_data(ws).await.expect("connection closed") {
        Message::Text(text) => text,
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Receive and parse one Introduction notification.
pub async fn recv_introduction(ws: &mut WsClient) -> (String, Vec<String>) {
    let text = recv_text_frame(ws).await;
    let msg = ServerMsg::from_json(&text).expect("introduction JSON");
    let ServerMsg::Introduction { id, keys } = msg;
    (id, keys)
}

/// Assert no data frame arrives within `ms` milliseconds.
pub async fn expect_silence(ws: &mut WsClient, ms: u64) {
    match timeout(Duration::from_millis(ms), ws.next()).await {
        Err(_) => {}
        Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
        Ok(Some(msg)) => panic!("expected silence, got {msg:?}"),
        Ok(None) => panic!("expected silence, connection closed"),
    }
}

/// Assert the server closes this connection.
pub async fn expect_closed(ws: &mut WsClient) {
    loop {
        match timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close")
        {
            None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
            Some(Ok(_)) => continue,
        }
    }
}

// ── Server-side pollers ───────────────────────────────────────────────────────

/// Wait until the registry holds exactly `expected` for `id`.
pub async fn wait_for_keys(state: &RelayState, id: &str, expected: &[&str]) {
    let expected: HashSet<String> = expected.iter().map(|k| k.to_string()).collect();
    for _ in 0..200 {
        if state.registry.keys_of(id).await.as_ref() == Some(&expected) {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("peer {id} never reached keys {expected:?}");
}

/// Wait until the peer is no longer registered at all.
pub async fn wait_for_unregistered(state: &RelayState, id: &str) {
    for _ in 0..200 {
        if state.registry.keys_of(id).await.is_none() {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("peer {id} never unregistered");
}

/// Wait until the rendezvous table holds exactly `n` half-open slots.
pub async fn wait_for_waiters(state: &RelayState, n: usize) {
    for _ in 0..200 {
        if state.rendezvous.len().await == n {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("rendezvous table never reached {n} slots");
}
