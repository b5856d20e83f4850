//! Pruning-point proof structures.

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::header::Header;

/// An ordered sequence of headers representing the historical chain of
/// pruning points. The first element is expected to be genesis and the last
/// the currently claimed pruning point.
pub type PruningPointsList = Vec<Header>;

/// A compact, levelled header structure demonstrating that the claimed
/// pruning point is the culmination of a valid high-work sub-chain.
///
/// Each level is an ordered header sequence; the claimed pruning point is the
/// last header of level 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruningPointProof {
    pub levels: Vec<Vec<Header>>,
}

impl PruningPointProof {
    pub fn new(levels: Vec<Vec<Header>>) -> Self {
        Self {
            levels,
        }
    }

    /// The hash of the last header of level 0, which is the pruning point the
    /// proof claims. `None` when the proof is structurally empty.
    pub fn claimed_pruning_point(&self) -> Option<Hash> {
        self.levels.first().and_then(|level| level.last()).map(Header::hash)
    }

    /// Total header count across all levels.
    pub fn header_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}
