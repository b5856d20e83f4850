//! Externally provided ghostDAG metadata.

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::header::BlueWork;

/// GhostDAG K-cluster size type.
pub type KType = u16;

/// GhostDAG data for a single block, as provided by a network peer.
///
/// During the anticone transfer phase the receiver accepts this without
/// recomputation; the data is indirectly validated through the PoW mined over
/// the blocks that reference it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWork,
    pub selected_parent: Hash,
    pub mergeset_blues: Vec<Hash>,
    pub mergeset_reds: Vec<Hash>,
    pub blues_anticone_sizes: Vec<(Hash, KType)>,
}

impl GhostdagData {
    /// Metadata for a block with no mergeset, anchored on `selected_parent`.
    pub fn chain_block(blue_score: u64, blue_work: BlueWork, selected_parent: Hash) -> Self {
        Self {
            blue_score,
            blue_work,
            selected_parent,
            mergeset_blues: Vec::new(),
            mergeset_reds: Vec::new(),
            blues_anticone_sizes: Vec::new(),
        }
    }
}
