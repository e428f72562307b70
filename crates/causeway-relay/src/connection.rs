//! Connection endpoint — drives the rendezvous table and the bridge.
//!
//! `GET /connection/{from}/{to}/{key}` upgrades to a message connection that
//! is bridged to the reciprocal `/connection/{to}/{from}/{key}`. Whichever
//! request arrives first waits in the table, buffering its frames; the
//! second arrival pairs, flushes, and both sides splice.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::stream::SplitStream;
use futures::StreamExt;
use tokio::sync::{broadcast, oneshot};

use crate::bridge;
use crate::rendezvous::{BridgePeer, BufferOutcome, Claim, Fingerprint, Slot};
use crate::server::RelayState;
use crate::transport;

pub async fn upgrade(
    ws: WebSocketUpgrade,
    Path((from, to, key)): Path<(String, String, String)>,
    State(state): State<RelayState>,
) -> Response {
    ws.on_upgrade(move |socket| run(state, from, to, key, socket))
}

async fn run(state: RelayState, from: String, to: String, key: String, socket: WebSocket) {
    let conn_id = state.connections.open("connection");
    let (sink, stream) = socket.split();
    let tx = transport::spawn_writer(sink);
    let (paired_tx, paired_rx) = oneshot::channel();
    let shutdown = state.shutdown.subscribe();

    let fingerprint: Fingerprint = (from, to, key);
    let slot = Slot {
        conn_id,
        tx: tx.clone(),
        buffer: Vec::new(),
        paired: paired_tx,
    };

    match state.rendezvous.pair_or_wait(fingerprint.clone(), slot).await {
        Claim::Paired { mate } => {
            tracing::debug!(
                from = %fingerprint.0,
                to = %fingerprint.1,
                key = %fingerprint.2,
                buffered = mate.buffer.len(),
                "rendezvous paired, bridging"
            );
            // Buffered frames go into our own outbound queue before the
            // waiter gets the channel: flush-before-splice by queue order.
            bridge::flush(mate.buffer, &tx);
            let _ = mate.paired.send(BridgePeer { tx });
            bridge::splice(stream, mate.tx, shutdown).await;
        }
        Claim::Waiting { evicted } => {
            if let Some(old) = evicted {
                tracing::debug!(
                    from = %fingerprint.0,
                    to = %fingerprint.1,
                    key = %fingerprint.2,
                    old_conn = old.conn_id,
                    "retried connection request replaces waiting slot"
                );
                drop(old);
            }
            // The slot owns the outbound handle now; holding a second copy
            // here would keep the socket open past eviction.
            drop(tx);
            wait_then_splice(&state, &fingerprint, conn_id, stream, paired_rx, shutdown).await;
        }
    }

    state.connections.close(conn_id);
    tracing::debug!(conn = conn_id, "connection endpoint closed");
}

/// Buffer inbound frames until the mate arrives, then splice. Returns when
/// the transport closes, the slot is evicted, or the relay shuts down.
async fn wait_then_splice(
    state: &RelayState,
    fingerprint: &Fingerprint,
    conn_id: u64,
    mut stream: SplitStream<WebSocket>,
    mut paired_rx: oneshot::Receiver<BridgePeer>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let counterpart = loop {
        tokio::select! {
            res = &mut paired_rx => match res {
                Ok(peer) => break peer.tx,
                // slot evicted by a retry — the replacement waits instead
                Err(_) => return,
            },
            _ = shutdown.recv() => {
                state.rendezvous.remove_if_held(fingerprint, conn_id).await;
                return;
            }
            msg = stream.next() => match msg {
                Some(Ok(frame @ (Message::Text(_) | Message::Binary(_)))) => {
                    match state.rendezvous.buffer_frame(fingerprint, conn_id, frame).await {
                        BufferOutcome::Buffered => {}
                        BufferOutcome::SlotGone(frame) => {
                            // Pairing took the slot between this frame's
                            // arrival and the lock; the mate is about to
                            // hand over its channel. Forward, don't drop.
                            match (&mut paired_rx).await {
                                Ok(peer) => {
                                    let _ = peer.tx.send(frame);
                                    break peer.tx;
                                }
                                Err(_) => return,
                            }
                        }
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    state.rendezvous.remove_if_held(fingerprint, conn_id).await;
                    return;
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "waiting transport error");
                    state.rendezvous.remove_if_held(fingerprint, conn_id).await;
                    return;
                }
            }
        }
    };

    bridge::splice(stream, counterpart, shutdown).await;
}
