//! UTXO records for the streamed pruning-point UTXO set.

use serde::{Deserialize, Serialize};

use crate::hash::Hash;

/// Reference to a transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub transaction_id: Hash,
    pub index: u32,
}

/// An unspent transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: Vec<u8>,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

/// A single element of a streamed UTXO-set chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpointAndUtxoEntryPair {
    pub outpoint: Outpoint,
    pub entry: UtxoEntry,
}
