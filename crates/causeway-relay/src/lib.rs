//! causeway-relay — the relay's two coupled state machines and their
//! WebSocket front-end.
//!
//! Introduction side: a registry of live peers and their subscribed keys,
//! plus the matcher that emits reciprocal introductions whenever two peers
//! share interest in a key. Connection side: a half-open rendezvous table
//! pairing reciprocal requests into a bidirectional frame pipe, buffering
//! early frames losslessly. The relay never inspects bridged bytes.

pub mod bridge;
pub mod connection;
pub mod introduction;
pub mod matcher;
pub mod registry;
pub mod rendezvous;
pub mod server;
pub mod transport;

pub use server::{Relay, RelayHandle, RelayState};
