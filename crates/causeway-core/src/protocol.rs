//! Causeway wire protocol — JSON documents exchanged on introduction
//! connections.
//!
//! These types ARE the protocol. Every message on an `/introduction/{id}`
//! connection is a single JSON document in one of these shapes. Messages on
//! `/connection/...` endpoints are opaque to the relay and never pass
//! through this module.

use serde::{Deserialize, Serialize};

/// Opaque peer identifier. Supplied by the client in the connection URL;
/// compared byte-exact, never interpreted.
pub type PeerId = String;

/// Opaque document key (also called a channel or discovery key).
/// Two peers expressing interest in the same key get introduced.
pub type Key = String;

/// Discriminator carried in the `type` field of client messages.
///
/// Informational only: the relay consumes the `join` and `leave` arrays
/// regardless of which variant the client claims. An unrecognized value is
/// a protocol error and closes the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgKind {
    Join,
    Leave,
    Introduction,
}

/// Client → server message on an introduction connection.
///
/// Missing arrays are treated as empty. A key listed in both `join` and
/// `leave` ends up unsubscribed — leave wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMsg {
    #[serde(rename = "type")]
    pub kind: MsgKind,
    #[serde(default)]
    pub join: Vec<Key>,
    #[serde(default)]
    pub leave: Vec<Key>,
}

/// Server → client message on an introduction connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// `id` is the other peer; `keys` is the non-empty set of keys the two
    /// peers share at the moment of emission. Clients must tolerate
    /// duplicates: a later key change that keeps a pair matched re-emits.
    Introduction { id: PeerId, keys: Vec<Key> },
}

impl ClientMsg {
    /// Parse one introduction-channel document. Any failure here is a
    /// protocol error: the relay closes the offending connection.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ServerMsg {
    /// Serialize for transmission.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a server document — the client side of the channel.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
