//! Block headers and their canonical hashing.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hash::Hash;

/// Accumulated proof-of-work along a block's selected chain, as derived by the
/// ghostDAG rule. Big-integer because it grows without bound.
pub type BlueWork = U256;

/// An immutable block header.
///
/// Identity is the SHA-256 digest of the canonical byte encoding produced by
/// [`Header::hash`]. `blue_score` and `blue_work` are ghostDAG-derived and are
/// part of the committed header, which is what lets a syncing node compare
/// remote tips without replaying the DAG.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u16,
    /// Direct parent hashes, ordered.
    pub parents: Vec<Hash>,
    pub hash_merkle_root: Hash,
    pub accepted_id_merkle_root: Hash,
    pub utxo_commitment: Hash,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub blue_score: u64,
    pub blue_work: BlueWork,
    pub pruning_point: Hash,
}

impl Header {
    /// Computes the content-addressed identity of this header.
    ///
    /// The encoding is fixed-order and length-prefixed where variable, so two
    /// headers hash equal exactly when all fields are equal.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update((self.parents.len() as u64).to_le_bytes());
        for parent in &self.parents {
            hasher.update(parent.as_bytes());
        }
        hasher.update(self.hash_merkle_root.as_bytes());
        hasher.update(self.accepted_id_merkle_root.as_bytes());
        hasher.update(self.utxo_commitment.as_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.bits.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.daa_score.to_le_bytes());
        hasher.update(self.blue_score.to_le_bytes());
        hasher.update(self.blue_work.to_big_endian());
        hasher.update(self.pruning_point.as_bytes());
        Hash::from_bytes(hasher.finalize().into())
    }

    /// Direct parents of this header.
    pub fn direct_parents(&self) -> &[Hash] {
        &self.parents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: 1,
            parents: vec![Hash::sha256(b"parent-a"), Hash::sha256(b"parent-b")],
            hash_merkle_root: Hash::sha256(b"merkle"),
            accepted_id_merkle_root: Hash::ZERO,
            utxo_commitment: Hash::ZERO,
            timestamp: 1_650_000_000_000,
            bits: 0x207f_ffff,
            nonce: 42,
            daa_score: 1000,
            blue_score: 1000,
            blue_work: BlueWork::from(5_000u64),
            pruning_point: Hash::ZERO,
        }
    }

    #[test]
    fn test_hash_is_stable() {
        let header = sample_header();
        assert_eq!(header.hash(), header.hash());
    }

    #[test]
    fn test_hash_commits_to_every_field() {
        let base = sample_header();

        let mut tweaked = base.clone();
        tweaked.nonce += 1;
        assert_ne!(base.hash(), tweaked.hash());

        let mut tweaked = base.clone();
        tweaked.blue_work += BlueWork::one();
        assert_ne!(base.hash(), tweaked.hash());

        let mut tweaked = base.clone();
        tweaked.parents.pop();
        assert_ne!(base.hash(), tweaked.hash());
    }
}
