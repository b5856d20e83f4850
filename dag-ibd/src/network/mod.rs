//! Peer-facing transport layer for the IBD session.

pub mod channel;
pub mod message;
pub mod reputation;

pub use channel::PeerMessageChannel;
pub use message::{Message, MessageType};
pub use reputation::PeerReputation;
