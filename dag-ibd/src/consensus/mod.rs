//! Interfaces through which the IBD flows consume the consensus engine.
//!
//! The engine itself lives outside this crate; everything the sync phases
//! need is expressed as narrow synchronous traits. Network suspension points
//! are the only async boundaries of a session, so DAG mutations between them
//! stay synchronous by construction.

pub mod staging;

use std::sync::Arc;

use dagcore::{Block, BlockWithTrustedData, Hash, Header, OutpointAndUtxoEntryPair, PruningPointProof};

use crate::error::{ConsensusResult, StagingError, StagingResult};

pub use staging::StagingConsensus;

/// Summary of what a consensus instance knows about a block hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub exists: bool,
    pub blue_score: u64,
    pub blue_work: dagcore::BlueWork,
}

impl BlockInfo {
    /// Info for a hash the consensus has never seen.
    pub fn missing() -> Self {
        Self {
            exists: false,
            blue_score: 0,
            blue_work: dagcore::BlueWork::zero(),
        }
    }
}

/// Read operations available on both live and staging consensus.
pub trait ConsensusApi: Send + Sync {
    /// The tip of the headers-selected chain.
    fn get_headers_selected_tip(&self) -> ConsensusResult<Hash>;

    /// What this consensus knows about `hash`. Never fails on unknown
    /// hashes; `exists` is false instead.
    fn get_block_info(&self, hash: &Hash) -> ConsensusResult<BlockInfo>;

    /// The header of `hash`, if known.
    fn get_header(&self, hash: &Hash) -> ConsensusResult<Option<Header>>;

    /// The current pruning point.
    fn pruning_point(&self) -> ConsensusResult<Hash>;

    /// Validates a pruning point proof against DAG rules: parent links,
    /// per-level blue-score monotonicity, sufficient accumulated work to
    /// cross the pruning window, and consistency with genesis.
    fn validate_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()>;

    /// Finality check over a proposed historical pruning-point chain.
    fn are_pruning_points_violating_finality(&self, pruning_points: &[Header]) -> ConsensusResult<bool>;
}

/// Mutations available only on the staging overlay.
pub trait StagingConsensusApi: ConsensusApi {
    /// Makes the staging consensus recognize the ancestor headers carried by
    /// an already validated proof.
    fn apply_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()>;

    /// Installs the historical pruning-point chain.
    fn import_pruning_points(&self, pruning_points: &[Header]) -> ConsensusResult<()>;

    /// Validates and inserts an anticone block, accepting its trusted DAG
    /// metadata without recomputation. `validate_utxo` is false throughout
    /// the anticone phase.
    fn validate_and_insert_block_with_trusted_data(
        &self,
        block: BlockWithTrustedData,
        validate_utxo: bool,
    ) -> ConsensusResult<()>;

    /// Validates and inserts a block in topological order; the engine
    /// enforces parent presence.
    fn validate_and_insert_block(&self, block: Block) -> ConsensusResult<()>;

    /// Whether `hash` is a valid pruning point candidate given the imported
    /// header DAG.
    fn is_valid_pruning_point(&self, hash: &Hash) -> ConsensusResult<bool>;

    /// Appends a chunk of the streamed UTXO set to the imported-pruning-point
    /// scratch area.
    fn append_imported_pruning_point_utxos(&self, pairs: &[OutpointAndUtxoEntryPair]) -> ConsensusResult<()>;

    /// Promotes the scratch UTXO set to the staged pruning point, verifying
    /// it against the pruning point's UTXO commitment.
    fn validate_and_insert_imported_pruning_point(&self, hash: &Hash) -> ConsensusResult<()>;

    /// Drops the imported-pruning-point scratch area.
    fn clear_imported_pruning_point_data(&self) -> ConsensusResult<()>;
}

/// The node-side factory for consensus instances.
///
/// `begin_staging` is single-owner: it fails while a staging overlay is
/// active, and clears any stale overlay left behind by a previous session
/// that ended without commit or discard. `discard_staging` removes all
/// staged effects including the imported-pruning-point scratch.
pub trait ConsensusDomain: Send + Sync {
    /// The live consensus. Reads here never observe staged state.
    fn consensus(&self) -> Arc<dyn ConsensusApi>;

    /// Starts a staging overlay. Fails with [`StagingError::AlreadyActive`]
    /// when one is in use.
    fn begin_staging(&self) -> Result<Arc<dyn StagingConsensusApi>, StagingError>;

    /// Atomically promotes the staged state into the live consensus.
    fn commit_staging(&self) -> StagingResult<()>;

    /// Drops all staged effects.
    fn discard_staging(&self) -> StagingResult<()>;

    /// Releases ownership of the overlay without promoting or wiping it;
    /// the next `begin_staging` clears the leftovers.
    fn release_staging(&self);
}
