//! Deterministic chain builders and the standard simnet fixture.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use dagcore::{
    Block, BlockWithTrustedData, BlueWork, GhostdagData, Hash, Header, Outpoint, OutpointAndUtxoEntryPair, Params,
    PruningPointProof, UtxoEntry,
};

use crate::config::IbdConfig;
use crate::error::RuleError;
use crate::test_utils::{MockDomain, ScriptedServer};

/// Genesis timestamp of the test network, in milliseconds.
const GENESIS_TIMESTAMP: u64 = 1_700_000_000_000;

/// Block interval of the test network, in milliseconds.
const BLOCK_INTERVAL_MS: u64 = 1_000;

/// Builds a header with work and timestamps derived from `blue_score`.
///
/// `seed` disambiguates otherwise identical headers on different branches.
pub fn make_header(parents: Vec<Hash>, blue_score: u64, seed: u64) -> Header {
    Header {
        version: 1,
        parents,
        hash_merkle_root: Hash::sha256(&seed.to_le_bytes()),
        accepted_id_merkle_root: Hash::ZERO,
        utxo_commitment: Hash::ZERO,
        timestamp: GENESIS_TIMESTAMP + blue_score * BLOCK_INTERVAL_MS,
        bits: 0x207f_ffff,
        nonce: seed,
        daa_score: blue_score,
        blue_score,
        blue_work: BlueWork::from(blue_score) * BlueWork::from(1_000u64),
        pruning_point: Hash::ZERO,
    }
}

/// Builds a linear chain of `len` headers on top of `parent`, starting at
/// blue score `parent.blue_score + 1`.
pub fn build_chain(parent: &Header, len: usize, seed: u64) -> Vec<Header> {
    let mut chain = Vec::with_capacity(len);
    let mut previous = parent.clone();
    for offset in 0..len {
        let header = make_header(vec![previous.hash()], previous.blue_score + 1, seed + offset as u64);
        previous = header.clone();
        chain.push(header);
    }
    chain
}

/// Failure-injection switches for [`simnet_fixture`].
#[derive(Debug, Default)]
pub struct FixtureOptions {
    /// The live consensus reports the served pruning-point chain as a
    /// finality violation.
    pub finality_violation: bool,
    /// Proof validation fails with a rule error.
    pub proof_rule_error: bool,
    /// Staging rejects every pruning point candidate.
    pub invalid_pruning_point: bool,
    /// UTXO installation fails with this rule error.
    pub utxo_install_error: Option<RuleError>,
    /// The served proof claims genesis as the pruning point.
    pub claim_genesis: bool,
}

/// A fully wired test network: a lagging local node and the data a synced
/// remote peer would serve.
pub struct Fixture {
    pub config: IbdConfig,
    pub domain: Arc<MockDomain>,
    pub server: ScriptedServer,
    /// The pruning point the served proof claims.
    pub pruning_point: Hash,
    /// The relayed block that triggered the session.
    pub high_block: Block,
    pub high_hash: Hash,
    /// Blue score of the local headers-selected tip.
    pub local_tip_blue_score: u64,
}

/// Builds the standard simnet scenario.
///
/// The local node holds its own short branch (tip blue score 100, pruning
/// point at 50). The remote branch reaches blue score 200 with a pruning
/// point at 150, which satisfies the launch gate for `pruning_depth` 50.
pub fn simnet_fixture(options: FixtureOptions) -> Fixture {
    let genesis = make_header(vec![], 0, 0);
    let genesis_hash = genesis.hash();
    let params = Params::simnet(genesis_hash);
    let config = IbdConfig::new(params)
        .with_message_timeout(std::time::Duration::from_secs(2))
        .with_proof_timeout(std::time::Duration::from_secs(2));

    // Local branch: genesis plus 100 blocks, pruning point at height 50.
    let local_chain = build_chain(&genesis, 100, 1_000_000);
    let local_pruning_point = local_chain[49].hash();
    let mut live_headers = vec![genesis.clone()];
    live_headers.extend(local_chain.iter().cloned());
    let domain = Arc::new(MockDomain::new(live_headers, local_pruning_point));

    let behavior = domain.behavior();
    behavior.finality_violation.store(options.finality_violation, Ordering::SeqCst);
    behavior.proof_rule_error.store(options.proof_rule_error, Ordering::SeqCst);
    behavior.invalid_pruning_point.store(options.invalid_pruning_point, Ordering::SeqCst);
    *behavior.utxo_install_error.lock().unwrap() = options.utxo_install_error.clone();

    // Remote branch: genesis plus 200 blocks.
    let remote_chain = build_chain(&genesis, 200, 2_000_000);
    let pruning_point_header = remote_chain[149].clone();
    let high_header = remote_chain[199].clone();
    let high_block = Block::from_header(high_header);
    let high_hash = high_block.hash();

    let (proof, pruning_points, trusted_blocks, pruning_point) = if options.claim_genesis {
        // A proof claiming genesis itself; structurally coherent so the
        // session reaches the explicit genesis guard.
        let proof = PruningPointProof::new(vec![vec![genesis.clone()]]);
        let trusted = vec![trusted_block(&genesis)];
        (proof, vec![genesis.clone()], trusted, genesis_hash)
    } else {
        // Level 0 carries the tail of the remote chain ending at the
        // claimed pruning point.
        let proof = PruningPointProof::new(vec![remote_chain[129..150].to_vec()]);
        let pruning_points = vec![
            genesis.clone(),
            remote_chain[49].clone(),
            remote_chain[99].clone(),
            pruning_point_header.clone(),
        ];
        // The pruning point itself first, then two anticone siblings.
        let anticone_a = make_header(vec![pruning_point_header.hash()], 151, 3_000_000);
        let anticone_b = make_header(vec![pruning_point_header.hash()], 151, 3_000_001);
        let trusted = vec![
            trusted_block(&pruning_point_header),
            trusted_block(&anticone_a),
            trusted_block(&anticone_b),
        ];
        (proof, pruning_points, trusted, pruning_point_header.hash())
    };

    let server = ScriptedServer {
        proof,
        pruning_points,
        trusted_blocks,
        headers: remote_chain[150..].iter().cloned().map(Block::from_header).collect(),
        utxo_chunks: utxo_chunks(),
        high_hash,
        omit_high_block: false,
        truncate_utxo: false,
        unexpected_pruning_point: false,
        interleave_inventory: false,
    };

    Fixture {
        config,
        domain,
        server,
        pruning_point,
        high_block,
        high_hash,
        local_tip_blue_score: 100,
    }
}

fn trusted_block(header: &Header) -> BlockWithTrustedData {
    BlockWithTrustedData {
        block: Block::from_header(header.clone()),
        ghostdag: GhostdagData::chain_block(
            header.blue_score,
            header.blue_work,
            header.direct_parents().first().copied().unwrap_or(Hash::ZERO),
        ),
        daa_window: Vec::new(),
        ghostdag_window: Vec::new(),
    }
}

fn utxo_chunks() -> Vec<Vec<OutpointAndUtxoEntryPair>> {
    (0..2u64)
        .map(|chunk| {
            (0..3u64)
                .map(|index| OutpointAndUtxoEntryPair {
                    outpoint: Outpoint {
                        transaction_id: Hash::sha256(&(chunk * 10 + index).to_le_bytes()),
                        index: index as u32,
                    },
                    entry: UtxoEntry {
                        amount: 100_000_000 * (index + 1),
                        script_public_key: vec![0x51],
                        block_daa_score: 140 + chunk,
                        is_coinbase: index == 0,
                    },
                })
                .collect()
        })
        .collect()
}
