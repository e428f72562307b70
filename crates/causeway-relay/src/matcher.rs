//! Introduction matching — who gets told about whom after a key update.

use causeway_core::keyset;
use causeway_core::protocol::{Key, ServerMsg};

use crate::registry::KeyUpdate;
use crate::transport::OutboundTx;

/// One queued `Introduction` send.
pub struct Emission {
    pub tx: OutboundTx,
    pub msg: ServerMsg,
}

/// Compute the introductions triggered by `peer`'s latest key update: one
/// message to each side of every non-empty intersection, keys sorted.
///
/// Matching is recomputed from scratch on every update — prior notifications
/// do not suppress a match, so clients see duplicates and must treat them
/// idempotently.
pub fn introductions(peer: &str, update: &KeyUpdate) -> Vec<Emission> {
    let mut out = Vec::new();
    for other in &update.others {
        if other.id == peer {
            // never introduce a peer to itself
            continue;
        }
        let common = keyset::intersect(&update.keys, &other.keys);
        if common.is_empty() {
            continue;
        }
        let mut keys: Vec<Key> = common.into_iter().collect();
        keys.sort();

        out.push(Emission {
            tx: update.self_tx.clone(),
            msg: ServerMsg::Introduction {
                id: other.id.clone(),
                keys: keys.clone(),
            },
        });
        out.push(Emission {
            tx: other.tx.clone(),
            msg: ServerMsg::Introduction {
                id: peer.to_string(),
                keys,
            },
        });
    }
    out
}
