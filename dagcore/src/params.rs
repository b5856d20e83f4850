//! Per-network consensus parameters consumed by the sync flows.

use crate::hash::Hash;
use crate::header::{BlueWork, Header};

/// Consensus parameters of a single network deployment.
///
/// Only the fields the synchronization layer reads are carried here; the
/// consensus engine owns the full rule set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Params {
    /// Human-readable network name, used in logs.
    pub name: &'static str,

    /// Hash of the network's genesis block.
    pub genesis_hash: Hash,

    /// Blue-score depth of the pruning horizon.
    pub pruning_depth: u64,

    /// Maximum accepted timestamp deviation, in blocks.
    pub timestamp_deviation_tolerance: u64,

    /// Expected block interval in milliseconds.
    pub target_time_per_block_ms: u64,
}

impl Params {
    /// The maximum wall-clock lag, in milliseconds, tolerated between the
    /// local tip and a freshly synced header chain's tip.
    pub fn timestamp_deviation_window_ms(&self) -> u64 {
        self.timestamp_deviation_tolerance * self.target_time_per_block_ms
    }

    /// Mainnet parameters.
    pub fn mainnet() -> Self {
        Self {
            name: "mainnet",
            genesis_hash: mainnet_genesis_header().hash(),
            pruning_depth: 185_798,
            timestamp_deviation_tolerance: 132,
            target_time_per_block_ms: 1_000,
        }
    }

    /// Small-scale parameters for local simulation and tests.
    pub fn simnet(genesis_hash: Hash) -> Self {
        Self {
            name: "simnet",
            genesis_hash,
            pruning_depth: 50,
            timestamp_deviation_tolerance: 10,
            target_time_per_block_ms: 1_000,
        }
    }
}

/// The mainnet genesis header.
///
/// Committed field-by-field; the network identity is its hash.
pub fn mainnet_genesis_header() -> Header {
    Header {
        version: 1,
        parents: vec![],
        hash_merkle_root: Hash::sha256(b"dagcore-mainnet-genesis-coinbase"),
        accepted_id_merkle_root: Hash::ZERO,
        utxo_commitment: Hash::ZERO,
        timestamp: 1_698_710_400_000,
        bits: 0x1e7f_ffff,
        nonce: 0x3392_c985,
        daa_score: 0,
        blue_score: 0,
        blue_work: BlueWork::zero(),
        pruning_point: Hash::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_genesis_matches_params() {
        let params = Params::mainnet();
        assert_eq!(params.genesis_hash, mainnet_genesis_header().hash());
    }

    #[test]
    fn test_deviation_window() {
        let params = Params::simnet(Hash::ZERO);
        assert_eq!(params.timestamp_deviation_window_ms(), 10_000);
    }
}
