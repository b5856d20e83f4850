//! Blocks packaged with trusted DAG metadata for the anticone transfer.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::ghostdag::GhostdagData;
use crate::hash::Hash;
use crate::header::Header;

/// A header together with the ghostDAG data of its block, part of the DAA
/// window shipped alongside an anticone block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedHeader {
    pub header: Header,
    pub ghostdag: GhostdagData,
}

/// A block plus the auxiliary DAG state the receiver accepts without
/// recomputation during the pruning-point anticone phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWithTrustedData {
    pub block: Block,
    pub ghostdag: GhostdagData,
    /// DAA window blocks needed to contextually validate `block`.
    pub daa_window: Vec<TrustedHeader>,
    /// GhostDAG data of window blocks referenced by `ghostdag`.
    pub ghostdag_window: Vec<(Hash, GhostdagData)>,
}

impl BlockWithTrustedData {
    /// The identity of the wrapped block.
    pub fn hash(&self) -> Hash {
        self.block.hash()
    }
}
