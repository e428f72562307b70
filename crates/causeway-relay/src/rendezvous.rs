//! Rendezvous table — half-open connection requests awaiting their mate.
//!
//! One table keyed by the ordered `(from, to, key)` triple. Each slot owns
//! both the waiter's outbound handle and its early-frame buffer, so "no
//! slot without its buffer" holds by construction. The mate lookup and the
//! insert are a single critical section, as is every buffer append: a frame
//! is either buffered into a live slot or reported back to the caller, never
//! lost in between.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{oneshot, Mutex};

use causeway_core::protocol::{Key, PeerId};

use crate::transport::OutboundTx;

/// `(from, to, key)`. Ordered: `(a, b, k)` and `(b, a, k)` are distinct
/// entries, which is what lets each party's transport be routed correctly.
pub type Fingerprint = (PeerId, PeerId, Key);

/// Handed to the waiter when its mate arrives: the outbound channel toward
/// the mate's socket.
pub struct BridgePeer {
    pub tx: OutboundTx,
}

/// One half-open request.
pub struct Slot {
    pub conn_id: u64,
    /// Outbound handle toward the waiter's socket. The arriving mate uses
    /// this to forward its frames.
    pub tx: OutboundTx,
    /// Frames received from the waiter since the slot was created, in
    /// arrival order.
    pub buffer: Vec<Message>,
    /// Fires when the mate arrives. Dropped unfired on eviction, which the
    /// waiter observes as a closed channel.
    pub paired: oneshot::Sender<BridgePeer>,
}

/// Outcome of a request's arrival.
pub enum Claim {
    /// No mate yet: the request now waits. `evicted` carries the older slot
    /// when this was a duplicate of an existing request (client retry) —
    /// dropping it closes the older transport.
    Waiting { evicted: Option<Slot> },
    /// The reciprocal request was waiting; its slot has been removed from
    /// the table and bridging can begin.
    Paired { mate: Slot },
}

/// Outcome of a buffer append.
pub enum BufferOutcome {
    Buffered,
    /// The slot is gone — pairing or eviction took it between this frame's
    /// arrival and the lock. The frame is handed back to the caller.
    SlotGone(Message),
}

#[derive(Default)]
pub struct RendezvousTable {
    slots: Mutex<HashMap<Fingerprint, Slot>>,
}

impl RendezvousTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair with the reciprocal slot if it is waiting, else insert `slot`.
    ///
    /// For a self-request (`from == to`) the mate triple equals the slot's
    /// own triple, so two such requests pair with each other.
    pub async fn pair_or_wait(&self, fingerprint: Fingerprint, slot: Slot) -> Claim {
        let mate_fp = (
            fingerprint.1.clone(),
            fingerprint.0.clone(),
            fingerprint.2.clone(),
        );
        let mut slots = self.slots.lock().await;
        if let Some(mate) = slots.remove(&mate_fp) {
            return Claim::Paired { mate };
        }
        let evicted = slots.insert(fingerprint, slot);
        Claim::Waiting { evicted }
    }

    /// Append a frame to the slot's buffer iff the slot still exists and is
    /// still held by `conn_id`.
    pub async fn buffer_frame(
        &self,
        fingerprint: &Fingerprint,
        conn_id: u64,
        frame: Message,
    ) -> BufferOutcome {
        let mut slots = self.slots.lock().await;
        match slots.get_mut(fingerprint) {
            Some(slot) if slot.conn_id == conn_id => {
                slot.buffer.push(frame);
                BufferOutcome::Buffered
            }
            _ => BufferOutcome::SlotGone(frame),
        }
    }

    /// Remove the slot iff it is still held by `conn_id` (waiter close).
    pub async fn remove_if_held(&self, fingerprint: &Fingerprint, conn_id: u64) -> bool {
        let mut slots = self.slots.lock().await;
        match slots.get(fingerprint) {
            Some(slot) if slot.conn_id == conn_id => {
                slots.remove(fingerprint);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
