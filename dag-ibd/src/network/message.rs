//! Wire frames exchanged during IBD-HP.
//!
//! The codec lives below this layer; flows see only the typed [`Message`]
//! enum and dispatch on its [`MessageType`] tag.

use std::fmt;

use dagcore::{Block, BlockWithTrustedData, Hash, Header, OutpointAndUtxoEntryPair, PruningPointProof};

/// Tag identifying a frame kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    InvRelayBlock,
    RequestPruningPointProof,
    PruningPointProof,
    RequestPruningPointAndItsAnticone,
    PruningPoints,
    BlockWithTrustedData,
    DoneBlocksWithTrustedData,
    RequestIbdHeaders,
    IbdBlock,
    DoneHeaders,
    RequestPruningPointUtxoSet,
    PruningPointUtxoSetChunk,
    DonePruningPointUtxoSet,
    UnexpectedPruningPoint,
}

impl MessageType {
    /// Wire command name of this frame kind.
    pub fn cmd(&self) -> &'static str {
        match self {
            MessageType::InvRelayBlock => "InvRelayBlock",
            MessageType::RequestPruningPointProof => "RequestPruningPointProof",
            MessageType::PruningPointProof => "PruningPointProof",
            MessageType::RequestPruningPointAndItsAnticone => "RequestPruningPointAndItsAnticone",
            MessageType::PruningPoints => "PruningPoints",
            MessageType::BlockWithTrustedData => "BlockWithTrustedData",
            MessageType::DoneBlocksWithTrustedData => "DoneBlocksWithTrustedData",
            MessageType::RequestIbdHeaders => "RequestIbdHeaders",
            MessageType::IbdBlock => "IbdBlock",
            MessageType::DoneHeaders => "DoneHeaders",
            MessageType::RequestPruningPointUtxoSet => "RequestPruningPointUtxoSet",
            MessageType::PruningPointUtxoSetChunk => "PruningPointUtxoSetChunk",
            MessageType::DonePruningPointUtxoSet => "DonePruningPointUtxoSet",
            MessageType::UnexpectedPruningPoint => "UnexpectedPruningPoint",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cmd())
    }
}

/// A typed frame on the peer route.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Relay inventory interleaved by the peer; side-channelled by the
    /// message channel, never seen by the sync phases.
    InvRelayBlock(Hash),

    RequestPruningPointProof,
    PruningPointProof(PruningPointProof),

    RequestPruningPointAndItsAnticone,
    PruningPoints(Vec<Header>),
    BlockWithTrustedData(Box<BlockWithTrustedData>),
    DoneBlocksWithTrustedData,

    RequestIbdHeaders {
        low: Hash,
        high: Hash,
    },
    /// A header-only block streamed during the future-headers phase.
    IbdBlock(Block),
    DoneHeaders,

    RequestPruningPointUtxoSet(Hash),
    PruningPointUtxoSetChunk(Vec<OutpointAndUtxoEntryPair>),
    DonePruningPointUtxoSet,
    /// Sent by the server when the requested pruning point is no longer its
    /// current one; the transfer cannot proceed against this peer right now.
    UnexpectedPruningPoint,
}

impl Message {
    /// The tag of this frame.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::InvRelayBlock(_) => MessageType::InvRelayBlock,
            Message::RequestPruningPointProof => MessageType::RequestPruningPointProof,
            Message::PruningPointProof(_) => MessageType::PruningPointProof,
            Message::RequestPruningPointAndItsAnticone => MessageType::RequestPruningPointAndItsAnticone,
            Message::PruningPoints(_) => MessageType::PruningPoints,
            Message::BlockWithTrustedData(_) => MessageType::BlockWithTrustedData,
            Message::DoneBlocksWithTrustedData => MessageType::DoneBlocksWithTrustedData,
            Message::RequestIbdHeaders {
                ..
            } => MessageType::RequestIbdHeaders,
            Message::IbdBlock(_) => MessageType::IbdBlock,
            Message::DoneHeaders => MessageType::DoneHeaders,
            Message::RequestPruningPointUtxoSet(_) => MessageType::RequestPruningPointUtxoSet,
            Message::PruningPointUtxoSetChunk(_) => MessageType::PruningPointUtxoSetChunk,
            Message::DonePruningPointUtxoSet => MessageType::DonePruningPointUtxoSet,
            Message::UnexpectedPruningPoint => MessageType::UnexpectedPruningPoint,
        }
    }

    /// Wire command name of this frame.
    pub fn cmd(&self) -> &'static str {
        self.message_type().cmd()
    }

    /// True for relay-inventory frames the channel skips transparently.
    pub fn is_inventory(&self) -> bool {
        matches!(self, Message::InvRelayBlock(_))
    }
}

impl From<&Message> for MessageType {
    fn from(message: &Message) -> Self {
        message.message_type()
    }
}
