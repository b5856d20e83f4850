//! Headers-proof initial block download engine for a block-DAG node.
//!
//! When a relayed tip dominates the local headers-selected tip by more than
//! one pruning window, the intermediate blocks may already be pruned on the
//! remote side. This crate drives the multi-phase recovery protocol against
//! a single peer:
//!
//! - Download and validate a pruning point proof
//! - Transfer the historical pruning-point chain and the anticone of the new
//!   pruning point with trusted metadata
//! - Stream all headers from the new pruning point up to the triggering tip
//! - Validate the imported timestamp window
//! - Stream and install the pruning-point UTXO set
//!
//! All mutations accumulate in a staging consensus that is committed
//! atomically on success or discarded on recoverable failure. Protocol
//! errors carry a banning classification that feeds the embedding node's
//! peer policy.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use dag_ibd::{IbdConfig, IbdController, PeerMessageChannel};
//! use dag_ibd::consensus::ConsensusDomain;
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! # async fn run(domain: Arc<dyn ConsensusDomain>, high_hash: dagcore::Hash) {
//! let (outgoing, _to_peer) = unbounded_channel();
//! let (_from_peer, incoming) = unbounded_channel();
//! let channel = PeerMessageChannel::new(outgoing, incoming);
//!
//! let mut controller = IbdController::new(IbdConfig::mainnet(), domain, channel, Arc::new(()));
//! match controller.ibd_with_headers_proof(high_hash).await {
//!     Ok(()) => {}
//!     Err(err) if err.should_ban_peer() => { /* disconnect and ban */ }
//!     Err(_) => { /* retry against another peer */ }
//! }
//! # }
//! ```

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub mod config;
pub mod consensus;
pub mod error;
pub mod logging;
pub mod network;
pub mod sync;

// Re-export main types for convenience
pub use config::IbdConfig;
pub use consensus::{BlockInfo, ConsensusApi, ConsensusDomain, StagingConsensus, StagingConsensusApi};
pub use error::{
    ConsensusError, IbdError, IbdResult, NetworkError, ProtocolError, RuleError, StagingError,
};
pub use logging::{init_console_logging, init_logging, LoggingConfig, LoggingError};
pub use network::{Message, MessageType, PeerMessageChannel, PeerReputation};
pub use sync::{IbdController, IbdPhase, IbdSession, UtxoSetOverrideHandler};
pub use tracing::level_filters::LevelFilter;

// Re-export commonly used dagcore types
pub use dagcore::{Block, BlockWithTrustedData, Hash, Header, Params, PruningPointProof};

/// Current version of the dag-ibd library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
