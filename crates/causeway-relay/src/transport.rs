//! Per-socket writer tasks and open-connection tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::mpsc;

/// Outbound handle for one client transport. Whichever structure currently
/// references a transport (registry record, rendezvous slot, or bridge
/// counterpart) holds one of these; the socket closes when the last sender
/// is dropped.
pub type OutboundTx = mpsc::UnboundedSender<Message>;

/// Spawn the writer task for one socket.
///
/// Sends are non-blocking for the rest of the relay: frames queue in the
/// channel and the task drains them into the sink. A sink error ends the
/// task — the read side observes the broken socket through its own loop.
pub fn spawn_writer(mut sink: SplitSink<WebSocket, Message>) -> OutboundTx {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });
    tx
}

/// Allocates connection ids and counts the transports still open.
///
/// The id is what every compare-and-remove discipline keys on: a late close
/// event from an evicted transport must not wipe out its replacement.
#[derive(Clone, Default)]
pub struct ConnectionTracker {
    next_id: Arc<AtomicU64>,
    live: Arc<DashMap<u64, &'static str>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted transport. Returns its connection id.
    pub fn open(&self, kind: &'static str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.insert(id, kind);
        id
    }

    pub fn close(&self, id: u64) {
        self.live.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
