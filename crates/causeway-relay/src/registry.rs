//! Peer registry — peer id → live introduction transport + current key set.
//!
//! One mutex guards the whole map: the matcher's update-and-snapshot must be
//! serializable with register/unregister, or two concurrent joins on a
//! shared key could each miss the other peer. No I/O happens under the
//! lock — sends go through non-blocking channels after it is dropped.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use causeway_core::keyset;
use causeway_core::protocol::{Key, PeerId};

use crate::transport::OutboundTx;

/// One live introduction connection. At most one record exists per peer id;
/// a reconnect with the same id evicts the previous record.
pub struct PeerRecord {
    pub conn_id: u64,
    pub tx: OutboundTx,
    pub keys: HashSet<Key>,
}

/// Copy of another peer's state, taken under the registry lock.
pub struct PeerSnapshot {
    pub id: PeerId,
    pub keys: HashSet<Key>,
    pub tx: OutboundTx,
}

/// Result of applying a key update: the peer's new key set plus a snapshot
/// of every other registered peer, all captured in one critical section.
pub struct KeyUpdate {
    pub keys: HashSet<Key>,
    pub self_tx: OutboundTx,
    pub others: Vec<PeerSnapshot>,
}

#[derive(Default)]
pub struct PeerRegistry {
    peers: Mutex<HashMap<PeerId, PeerRecord>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `id`. The key set starts empty —
    /// a reconnecting client re-announces its subscriptions.
    ///
    /// Returns the evicted record, if any. Dropping it releases the old
    /// transport's outbound handle, which closes the old socket; the old
    /// read loop then unwinds exactly as it would on a client-side close.
    pub async fn register(&self, id: &str, conn_id: u64, tx: OutboundTx) -> Option<PeerRecord> {
        let mut peers = self.peers.lock().await;
        peers.insert(
            id.to_string(),
            PeerRecord {
                conn_id,
                tx,
                keys: HashSet::new(),
            },
        )
    }

    /// Remove the peer iff its record still holds `conn_id`. A late close
    /// from an evicted transport must not wipe out a fresh registration.
    pub async fn unregister(&self, id: &str, conn_id: u64) -> bool {
        let mut peers = self.peers.lock().await;
        match peers.get(id) {
            Some(record) if record.conn_id == conn_id => {
                peers.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Apply a join/leave update and snapshot every other peer, atomically.
    ///
    /// Returns `None` when `id` is no longer registered under `conn_id`
    /// (the connection was superseded mid-message); the caller closes.
    pub async fn update_keys(
        &self,
        id: &str,
        conn_id: u64,
        join: &[Key],
        leave: &[Key],
    ) -> Option<KeyUpdate> {
        let mut peers = self.peers.lock().await;

        let record = match peers.get_mut(id) {
            Some(record) if record.conn_id == conn_id => record,
            _ => return None,
        };
        record.keys = keyset::apply_join_leave(&record.keys, join, leave);
        let keys = record.keys.clone();
        let self_tx = record.tx.clone();

        let others = peers
            .iter()
            .filter(|(other_id, _)| other_id.as_str() != id)
            .map(|(other_id, other)| PeerSnapshot {
                id: other_id.clone(),
                keys: other.keys.clone(),
                tx: other.tx.clone(),
            })
            .collect();

        Some(KeyUpdate {
            keys,
            self_tx,
            others,
        })
    }

    /// Current key set of `id`, if registered.
    pub async fn keys_of(&self, id: &str) -> Option<HashSet<Key>> {
        let peers = self.peers.lock().await;
        peers.get(id).map(|record| record.keys.clone())
    }

    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }
}
