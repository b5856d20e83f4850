//! Blocks and transactions.

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::header::Header;

/// A transaction carried inside a block.
///
/// The IBD flows treat transaction contents as opaque: nothing in this crate
/// validates them, and header-only transfers ship blocks with an empty
/// transaction list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Content-addressed transaction id.
    pub fn id(&self) -> Hash {
        let mut bytes = Vec::with_capacity(2 + self.payload.len());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        Hash::sha256(&bytes)
    }
}

/// A block: header plus transaction list. Identity is the header hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Wraps a header as a block with no body, the form used for header-only
    /// transfer during IBD.
    pub fn from_header(header: Header) -> Self {
        Self {
            header,
            transactions: Vec::new(),
        }
    }

    /// The block's content-addressed identity.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// True when the block carries no transactions.
    pub fn is_header_only(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BlueWork;

    fn header() -> Header {
        Header {
            version: 1,
            parents: vec![],
            hash_merkle_root: Hash::ZERO,
            accepted_id_merkle_root: Hash::ZERO,
            utxo_commitment: Hash::ZERO,
            timestamp: 0,
            bits: 0,
            nonce: 0,
            daa_score: 0,
            blue_score: 0,
            blue_work: BlueWork::zero(),
            pruning_point: Hash::ZERO,
        }
    }

    #[test]
    fn test_block_identity_is_header_hash() {
        let block = Block::from_header(header());
        assert_eq!(block.hash(), block.header.hash());
        assert!(block.is_header_only());
    }

    #[test]
    fn test_transaction_id_commits_to_payload() {
        let a = Transaction {
            version: 0,
            payload: vec![1, 2, 3],
        };
        let b = Transaction {
            version: 0,
            payload: vec![1, 2, 4],
        };
        assert_ne!(a.id(), b.id());
    }
}
