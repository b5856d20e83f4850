//! Test fixtures: an in-memory consensus domain, a scripted remote peer, and
//! deterministic chain builders.

mod chain;
mod consensus;
mod server;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::unbounded_channel;

pub use chain::{build_chain, make_header, simnet_fixture, Fixture, FixtureOptions};
pub use consensus::{MockBehavior, MockDomain};
pub use server::{RemotePeer, ScriptedServer};

use crate::error::ConsensusResult;
use crate::network::PeerMessageChannel;
use crate::sync::UtxoSetOverrideHandler;

/// Creates a connected channel/remote-peer pair.
///
/// Dropping the [`RemotePeer`] closes the incoming route, which the channel
/// reports as a peer disconnect.
pub fn peer_channel() -> (PeerMessageChannel, RemotePeer) {
    let (out_tx, out_rx) = unbounded_channel();
    let (in_tx, in_rx) = unbounded_channel();
    (PeerMessageChannel::new(out_tx, in_rx), RemotePeer::new(in_tx, out_rx))
}

/// Override handler that counts invocations.
#[derive(Debug, Default)]
pub struct CountingOverrideHandler {
    calls: AtomicUsize,
}

impl CountingOverrideHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UtxoSetOverrideHandler for CountingOverrideHandler {
    async fn on_pruning_point_utxo_set_override(&self) -> ConsensusResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
