//! In-memory consensus domain backing the IBD tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dagcore::{Block, BlockWithTrustedData, Hash, Header, OutpointAndUtxoEntryPair, PruningPointProof};

use crate::consensus::{BlockInfo, ConsensusApi, ConsensusDomain, StagingConsensusApi};
use crate::error::{ConsensusError, ConsensusResult, RuleError, StagingError, StagingResult};

/// Behavior knobs for failure injection.
#[derive(Debug, Default)]
pub struct MockBehavior {
    /// `validate_pruning_point_proof` reports a rule violation.
    pub proof_rule_error: AtomicBool,
    /// `are_pruning_points_violating_finality` reports a violation.
    pub finality_violation: AtomicBool,
    /// `is_valid_pruning_point` rejects every candidate.
    pub invalid_pruning_point: AtomicBool,
    /// `validate_and_insert_imported_pruning_point` fails with this rule.
    pub utxo_install_error: Mutex<Option<RuleError>>,
}

#[derive(Debug, Default)]
struct ChainState {
    headers: HashMap<Hash, Header>,
    pruning_point: Hash,
    pruning_points_list: Vec<Header>,
    imported_utxos: Vec<OutpointAndUtxoEntryPair>,
    utxo_installed: bool,
}

impl ChainState {
    fn selected_tip(&self, fallback: Option<&ChainState>) -> Option<Hash> {
        let own = self.headers.values();
        let base = fallback.map(|state| state.headers.values()).into_iter().flatten();
        own.chain(base)
            .max_by_key(|header| (header.blue_work, header.hash()))
            .map(Header::hash)
    }

    fn lookup(&self, hash: &Hash, fallback: Option<&ChainState>) -> Option<Header> {
        self.headers
            .get(hash)
            .cloned()
            .or_else(|| fallback.and_then(|state| state.headers.get(hash).cloned()))
    }
}

/// An in-memory [`ConsensusDomain`] with a single staging slot.
///
/// DAG rule enforcement is reduced to bookkeeping: headers are stored,
/// parent presence is checked on ordinary inserts, and the behavior knobs
/// inject the rule failures the real engine would produce.
#[derive(Debug)]
pub struct MockDomain {
    live: Arc<Mutex<ChainState>>,
    overlay: Mutex<Option<Arc<Mutex<ChainState>>>>,
    behavior: Arc<MockBehavior>,
    staging_active: AtomicBool,
    clear_count: Arc<AtomicUsize>,
}

impl MockDomain {
    /// Creates a domain whose live consensus knows `headers`, with the given
    /// pruning point.
    pub fn new(headers: impl IntoIterator<Item = Header>, pruning_point: Hash) -> Self {
        let mut state = ChainState::default();
        for header in headers {
            state.headers.insert(header.hash(), header);
        }
        state.pruning_point = pruning_point;
        Self {
            live: Arc::new(Mutex::new(state)),
            overlay: Mutex::new(None),
            behavior: Arc::new(MockBehavior::default()),
            staging_active: AtomicBool::new(false),
            clear_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn behavior(&self) -> &MockBehavior {
        &self.behavior
    }

    /// How many times the imported-pruning-point scratch has been cleared.
    pub fn imported_utxo_clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }

    /// Whether a staging overlay is currently owned by a session.
    pub fn staging_active(&self) -> bool {
        self.staging_active.load(Ordering::SeqCst)
    }

    /// Whether the live consensus knows `hash`.
    pub fn live_block_exists(&self, hash: &Hash) -> bool {
        self.live.lock().unwrap().headers.contains_key(hash)
    }

    /// The live pruning point.
    pub fn live_pruning_point(&self) -> Hash {
        self.live.lock().unwrap().pruning_point
    }

    /// Whether the live consensus carries an installed pruning-point UTXO set.
    pub fn live_utxo_installed(&self) -> bool {
        self.live.lock().unwrap().utxo_installed
    }

    /// Number of headers the live consensus knows.
    pub fn live_header_count(&self) -> usize {
        self.live.lock().unwrap().headers.len()
    }
}

impl ConsensusDomain for MockDomain {
    fn consensus(&self) -> Arc<dyn ConsensusApi> {
        Arc::new(MockConsensus {
            state: self.live.clone(),
            behavior: self.behavior.clone(),
        })
    }

    fn begin_staging(&self) -> Result<Arc<dyn StagingConsensusApi>, StagingError> {
        if self.staging_active.swap(true, Ordering::SeqCst) {
            return Err(StagingError::AlreadyActive);
        }
        // Clear any stale overlay left by a session that ended without
        // commit or discard.
        let overlay = Arc::new(Mutex::new(ChainState::default()));
        *self.overlay.lock().unwrap() = Some(overlay.clone());
        Ok(Arc::new(MockStagingConsensus {
            live: self.live.clone(),
            overlay,
            behavior: self.behavior.clone(),
            clear_count: self.clear_count.clone(),
        }))
    }

    fn commit_staging(&self) -> StagingResult<()> {
        let Some(overlay) = self.overlay.lock().unwrap().take() else {
            return Err(StagingError::NotActive);
        };
        let staged = std::mem::take(&mut *overlay.lock().unwrap());
        let mut live = self.live.lock().unwrap();
        live.headers.extend(staged.headers);
        if let Some(last) = staged.pruning_points_list.last() {
            live.pruning_point = last.hash();
        }
        live.pruning_points_list = staged.pruning_points_list;
        live.utxo_installed = staged.utxo_installed;
        self.staging_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn discard_staging(&self) -> StagingResult<()> {
        let Some(overlay) = self.overlay.lock().unwrap().take() else {
            return Err(StagingError::NotActive);
        };
        drop(overlay);
        // Discard wipes the imported-pruning-point scratch along with
        // everything else.
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        self.staging_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release_staging(&self) {
        self.staging_active.store(false, Ordering::SeqCst);
    }
}

struct MockConsensus {
    state: Arc<Mutex<ChainState>>,
    behavior: Arc<MockBehavior>,
}

impl ConsensusApi for MockConsensus {
    fn get_headers_selected_tip(&self) -> ConsensusResult<Hash> {
        self.state
            .lock()
            .unwrap()
            .selected_tip(None)
            .ok_or_else(|| ConsensusError::Store("consensus has no headers".to_string()))
    }

    fn get_block_info(&self, hash: &Hash) -> ConsensusResult<BlockInfo> {
        Ok(block_info(self.state.lock().unwrap().lookup(hash, None)))
    }

    fn get_header(&self, hash: &Hash) -> ConsensusResult<Option<Header>> {
        Ok(self.state.lock().unwrap().lookup(hash, None))
    }

    fn pruning_point(&self) -> ConsensusResult<Hash> {
        Ok(self.state.lock().unwrap().pruning_point)
    }

    fn validate_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()> {
        validate_proof(&self.behavior, proof)
    }

    fn are_pruning_points_violating_finality(&self, _pruning_points: &[Header]) -> ConsensusResult<bool> {
        Ok(self.behavior.finality_violation.load(Ordering::SeqCst))
    }
}

struct MockStagingConsensus {
    live: Arc<Mutex<ChainState>>,
    overlay: Arc<Mutex<ChainState>>,
    behavior: Arc<MockBehavior>,
    clear_count: Arc<AtomicUsize>,
}

impl MockStagingConsensus {
    fn insert_header(&self, header: Header) {
        self.overlay.lock().unwrap().headers.insert(header.hash(), header);
    }

    fn known(&self, hash: &Hash) -> bool {
        let live = self.live.lock().unwrap();
        let overlay = self.overlay.lock().unwrap();
        overlay.headers.contains_key(hash) || live.headers.contains_key(hash)
    }
}

impl ConsensusApi for MockStagingConsensus {
    fn get_headers_selected_tip(&self) -> ConsensusResult<Hash> {
        let live = self.live.lock().unwrap();
        self.overlay
            .lock()
            .unwrap()
            .selected_tip(Some(&live))
            .ok_or_else(|| ConsensusError::Store("staging consensus has no headers".to_string()))
    }

    fn get_block_info(&self, hash: &Hash) -> ConsensusResult<BlockInfo> {
        let live = self.live.lock().unwrap();
        Ok(block_info(self.overlay.lock().unwrap().lookup(hash, Some(&live))))
    }

    fn get_header(&self, hash: &Hash) -> ConsensusResult<Option<Header>> {
        let live = self.live.lock().unwrap();
        Ok(self.overlay.lock().unwrap().lookup(hash, Some(&live)))
    }

    fn pruning_point(&self) -> ConsensusResult<Hash> {
        let staged = self.overlay.lock().unwrap().pruning_points_list.last().map(Header::hash);
        Ok(match staged {
            Some(hash) => hash,
            None => self.live.lock().unwrap().pruning_point,
        })
    }

    fn validate_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()> {
        validate_proof(&self.behavior, proof)
    }

    fn are_pruning_points_violating_finality(&self, _pruning_points: &[Header]) -> ConsensusResult<bool> {
        Ok(self.behavior.finality_violation.load(Ordering::SeqCst))
    }
}

impl StagingConsensusApi for MockStagingConsensus {
    fn apply_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()> {
        for level in &proof.levels {
            for header in level {
                self.insert_header(header.clone());
            }
        }
        Ok(())
    }

    fn import_pruning_points(&self, pruning_points: &[Header]) -> ConsensusResult<()> {
        let mut overlay = self.overlay.lock().unwrap();
        for header in pruning_points {
            overlay.headers.insert(header.hash(), header.clone());
        }
        overlay.pruning_points_list = pruning_points.to_vec();
        Ok(())
    }

    fn validate_and_insert_block_with_trusted_data(
        &self,
        block: BlockWithTrustedData,
        _validate_utxo: bool,
    ) -> ConsensusResult<()> {
        // Trusted metadata substitutes for contextual validation; parents may
        // be below the pruning horizon.
        self.insert_header(block.block.header);
        Ok(())
    }

    fn validate_and_insert_block(&self, block: Block) -> ConsensusResult<()> {
        let hash = block.hash();
        for parent in block.header.direct_parents() {
            if !self.known(parent) {
                return Err(RuleError::InvalidBlock {
                    hash,
                    reason: format!("missing parent {}", parent),
                }
                .into());
            }
        }
        self.insert_header(block.header);
        Ok(())
    }

    fn is_valid_pruning_point(&self, hash: &Hash) -> ConsensusResult<bool> {
        if self.behavior.invalid_pruning_point.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.known(hash))
    }

    fn append_imported_pruning_point_utxos(&self, pairs: &[OutpointAndUtxoEntryPair]) -> ConsensusResult<()> {
        self.overlay.lock().unwrap().imported_utxos.extend_from_slice(pairs);
        Ok(())
    }

    fn validate_and_insert_imported_pruning_point(&self, _hash: &Hash) -> ConsensusResult<()> {
        if let Some(rule) = self.behavior.utxo_install_error.lock().unwrap().clone() {
            return Err(rule.into());
        }
        let mut overlay = self.overlay.lock().unwrap();
        if overlay.imported_utxos.is_empty() {
            return Err(RuleError::InvalidImportedUtxoSet("no UTXO data imported".to_string()).into());
        }
        overlay.utxo_installed = true;
        Ok(())
    }

    fn clear_imported_pruning_point_data(&self) -> ConsensusResult<()> {
        self.overlay.lock().unwrap().imported_utxos.clear();
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn block_info(header: Option<Header>) -> BlockInfo {
    match header {
        Some(header) => BlockInfo {
            exists: true,
            blue_score: header.blue_score,
            blue_work: header.blue_work,
        },
        None => BlockInfo::missing(),
    }
}

fn validate_proof(behavior: &MockBehavior, proof: &PruningPointProof) -> ConsensusResult<()> {
    if behavior.proof_rule_error.load(Ordering::SeqCst) {
        return Err(RuleError::InvalidPruningPointProof(
            "insufficient accumulated work over the pruning window".to_string(),
        )
        .into());
    }
    if proof.claimed_pruning_point().is_none() {
        return Err(RuleError::InvalidPruningPointProof("proof has no level-0 headers".to_string()).into());
    }
    Ok(())
}
