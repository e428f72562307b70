//! causeway-core — shared types, wire protocol, and configuration.
//! All other Causeway crates depend on this one.

pub mod config;
pub mod keyset;
pub mod protocol;

pub use protocol::{ClientMsg, Key, MsgKind, PeerId, ServerMsg};
