//! Socket bridge — flush buffered frames, then splice two transports.
//!
//! A bridge is two of these read loops running in the paired connection
//! tasks, cross-wired through the writer channels. Framing is preserved:
//! one inbound message becomes exactly one outbound message, and the relay
//! never inspects the payload.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::StreamExt;
use tokio::sync::broadcast;

use crate::transport::OutboundTx;

/// Enqueue the waiter's early frames toward the just-arrived socket.
///
/// The caller runs this on its own outbound channel before handing that
/// channel to the waiter, so queue order alone guarantees every buffered
/// frame precedes anything the waiter forwards after bridging begins.
pub fn flush(buffer: Vec<Message>, tx: &OutboundTx) {
    for frame in buffer {
        if tx.send(frame).is_err() {
            // our own socket already died; teardown happens in the splice
            break;
        }
    }
}

/// Forward every data frame from `stream` into `counterpart` until either
/// side closes or the relay shuts down.
///
/// Returning drops `counterpart`, which is the teardown: the far writer
/// drains, closes its socket, and the far read loop ends the same way.
pub async fn splice(
    mut stream: SplitStream<WebSocket>,
    counterpart: OutboundTx,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            msg = stream.next() => match msg {
                Some(Ok(frame @ (Message::Text(_) | Message::Binary(_)))) => {
                    if counterpart.send(frame).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "bridged transport error");
                    break;
                }
            }
        }
    }
}
