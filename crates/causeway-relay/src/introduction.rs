//! Introduction endpoint — drives the peer registry and the matcher.
//!
//! `GET /introduction/{id}` upgrades to a message connection carrying JSON
//! key updates from the peer and `Introduction` notifications back to it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::StreamExt;

use causeway_core::protocol::ClientMsg;

use crate::matcher;
use crate::server::RelayState;
use crate::transport;

pub async fn upgrade(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<RelayState>,
) -> Response {
    ws.on_upgrade(move |socket| run(state, id, socket))
}

async fn run(state: RelayState, id: String, socket: WebSocket) {
    let conn_id = state.connections.open("introduction");
    let (sink, mut stream) = socket.split();
    let tx = transport::spawn_writer(sink);

    // Insert-or-replace: a reconnect with the same id must not leak the old
    // registration while the old socket's close is still in flight.
    if let Some(old) = state.registry.register(&id, conn_id, tx).await {
        tracing::info!(peer = %id, old_conn = old.conn_id, "introduction connection superseded");
        drop(old);
    }
    tracing::debug!(peer = %id, conn = conn_id, "peer registered");

    let mut shutdown = state.shutdown.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if !handle_update(&state, &id, conn_id, text.as_str()).await {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    let Ok(text) = std::str::from_utf8(&data) else {
                        tracing::warn!(peer = %id, "non-UTF-8 introduction message");
                        break;
                    };
                    if !handle_update(&state, &id, conn_id, text).await {
                        break;
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(peer = %id, error = %e, "introduction transport error");
                    break;
                }
            }
        }
    }

    if state.registry.unregister(&id, conn_id).await {
        tracing::debug!(peer = %id, conn = conn_id, "peer unregistered");
    }
    state.connections.close(conn_id);
}

/// Apply one key-update message and emit the resulting introductions.
/// Returns false when the connection should close: malformed message, or a
/// newer connection for this id took over.
async fn handle_update(state: &RelayState, id: &str, conn_id: u64, text: &str) -> bool {
    let msg = match ClientMsg::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(peer = %id, error = %e, "malformed introduction message");
            return false;
        }
    };

    let update = match state
        .registry
        .update_keys(id, conn_id, &msg.join, &msg.leave)
        .await
    {
        Some(u) => u,
        None => return false,
    };
    tracing::debug!(
        peer = %id,
        kind = ?msg.kind,
        keys = update.keys.len(),
        peers = update.others.len(),
        "key set updated"
    );

    for emission in matcher::introductions(id, &update) {
        let json = match emission.msg.to_json() {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, "introduction serialization failed");
                continue;
            }
        };
        if emission.tx.send(Message::Text(json.into())).is_err() {
            // recipient disconnected between snapshot and send
            tracing::debug!(peer = %id, "introduction dropped, recipient gone");
        }
    }
    true
}
