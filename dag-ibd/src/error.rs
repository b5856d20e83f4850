//! Error types for the IBD-HP engine.
//!
//! Errors fall into four kinds, and every error that reaches the controller
//! answers two questions: is the session recoverable (retry against another
//! peer after discarding staging), and is the peer to blame (disconnect and
//! ban). Protocol errors are tagged with their banning classification at the
//! site that creates them; nothing downstream inspects message strings.

use std::time::Duration;

use thiserror::Error;

use dagcore::Hash;

use crate::network::message::{Message, MessageType};

/// Consensus rule violations surfaced by the engine through the consensus
/// interfaces. The sync layer converts these into banning protocol errors at
/// the call sites that receive peer data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("pruning point proof violates consensus rules: {0}")]
    InvalidPruningPointProof(String),

    #[error("block {hash} failed validation: {reason}")]
    InvalidBlock { hash: Hash, reason: String },

    #[error("imported pruning point UTXO set is inconsistent: {0}")]
    InvalidImportedUtxoSet(String),

    #[error("the suggested pruning point violates finality")]
    SuggestedPruningViolatesFinality,
}

/// Errors produced by the consensus interfaces.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Rule violation: {0}")]
    Rule(#[from] RuleError),

    #[error("Store failure: {0}")]
    Store(String),
}

/// Staging consensus lifecycle errors.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("a staging consensus is already active")]
    AlreadyActive,

    #[error("no staging consensus is active")]
    NotActive,

    #[error("failed to commit staging consensus: {0}")]
    CommitFailed(String),

    #[error("failed to discard staging consensus: {0}")]
    DiscardFailed(String),
}

/// Transport-level failures on the peer route. Infrastructure conditions:
/// never the peer's provable fault, always recoverable.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Peer disconnected")]
    PeerDisconnected,

    #[error("Timed out after {timeout:?} waiting for {expected}")]
    Timeout {
        timeout: Duration,
        expected: &'static str,
    },
}

/// Protocol violations attributable to the remote peer.
///
/// Each variant corresponds to one check in the sync phases. The banning
/// classification is a property of the variant, not of the call site:
/// finality conflicts are the only violations a well-behaved peer can cause.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("received unexpected message type. expected: {expected}, got: {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("the pruning point proof is structurally empty")]
    EmptyPruningPointProof,

    #[error("pruning point proof validation failed: {0}")]
    InvalidPruningPointProof(RuleError),

    #[error("the proposed pruning point is the same as the current pruning point")]
    SamePruningPoint,

    #[error("pruning points are violating finality")]
    PruningPointsViolateFinality,

    #[error("the proof pruning point is not equal to the last pruning point in the list")]
    PruningPointsListMismatch,

    #[error("the first pruning point in the list is expected to be genesis")]
    PruningPointsListNotGenesisAnchored,

    #[error("got `done` message before receiving the pruning point")]
    EmptyTrustedDataStream,

    #[error("first block with trusted data is not the pruning point")]
    TrustedDataRootMismatch,

    #[error("the genesis pruning point violates finality")]
    GenesisPruningPoint,

    #[error("the triggering IBD block was not sent")]
    MissingTriggeringBlock,

    #[error("invalid pruning point {0}")]
    InvalidPruningPoint(Hash),

    #[error("got invalid block from peer: {0}")]
    InvalidBlockData(RuleError),

    #[error("error with pruning point UTXO set: {0}")]
    InvalidImportedUtxoSet(RuleError),

    #[error("the staged headers selected tip timestamp is not far enough ahead of the local tip")]
    StagedTimestampsTooOld,
}

impl ProtocolError {
    /// Builds the unexpected-message error for a frame that arrived where
    /// `expected` was required.
    pub fn unexpected(expected: MessageType, got: &Message) -> Self {
        Self::UnexpectedMessage {
            expected: expected.cmd(),
            got: got.cmd(),
        }
    }

    /// Whether the higher layer should disconnect and ban the peer.
    pub fn is_banning(&self) -> bool {
        !matches!(self, Self::PruningPointsViolateFinality)
    }
}

/// Umbrella error for a single IBD session.
#[derive(Debug, Error)]
pub enum IbdError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),
}

impl IbdError {
    /// Recoverable errors abort the session, discard staging, and allow a
    /// retry against another peer. Non-recoverable errors indicate local
    /// failure; the connection is torn down without cleanup.
    pub fn is_recoverable(&self) -> bool {
        match self {
            IbdError::Network(_) | IbdError::Protocol(_) => true,
            IbdError::Consensus(_) | IbdError::Staging(_) => false,
        }
    }

    /// Whether this error should feed the peer-banning policy.
    pub fn should_ban_peer(&self) -> bool {
        match self {
            IbdError::Protocol(err) => err.is_banning(),
            _ => false,
        }
    }
}

/// Type alias for Result with IbdError.
pub type IbdResult<T> = std::result::Result<T, IbdError>;

/// Type alias for consensus operation results.
pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;

/// Type alias for network operation results.
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Type alias for staging lifecycle results.
pub type StagingResult<T> = std::result::Result<T, StagingError>;
