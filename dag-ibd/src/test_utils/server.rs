//! A scripted remote peer serving the IBD protocol from prepared data.

use dagcore::{Block, BlockWithTrustedData, Hash, Header, OutpointAndUtxoEntryPair, PruningPointProof};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::network::message::Message;

/// The remote half of a [`peer_channel`](crate::test_utils::peer_channel)
/// pair. Dropping it disconnects the peer.
#[derive(Debug)]
pub struct RemotePeer {
    to_local: UnboundedSender<Message>,
    from_local: UnboundedReceiver<Message>,
}

impl RemotePeer {
    pub(crate) fn new(to_local: UnboundedSender<Message>, from_local: UnboundedReceiver<Message>) -> Self {
        Self {
            to_local,
            from_local,
        }
    }

    /// Delivers a frame to the local node, ignoring a closed route.
    pub fn send(&self, message: Message) {
        let _ = self.to_local.send(message);
    }

    /// Next request enqueued by the local node, or `None` once the local
    /// side hung up.
    pub async fn recv_request(&mut self) -> Option<Message> {
        self.from_local.recv().await
    }
}

/// Serves the full IBD-HP protocol from prepared data, with switches for the
/// misbehaviors the tests exercise.
#[derive(Clone, Debug)]
pub struct ScriptedServer {
    pub proof: PruningPointProof,
    pub pruning_points: Vec<Header>,
    pub trusted_blocks: Vec<BlockWithTrustedData>,
    /// Header-only blocks from the pruning point (exclusive) up to the tip.
    pub headers: Vec<Block>,
    pub utxo_chunks: Vec<Vec<OutpointAndUtxoEntryPair>>,
    /// The triggering tip, for the `omit_high_block` switch.
    pub high_hash: Hash,

    /// Withhold the triggering block from the header stream.
    pub omit_high_block: bool,
    /// Disconnect after the first UTXO chunk.
    pub truncate_utxo: bool,
    /// Refuse the UTXO request because the pruning point moved.
    pub unexpected_pruning_point: bool,
    /// Sprinkle relay-inventory frames ahead of every response.
    pub interleave_inventory: bool,
}

impl ScriptedServer {
    /// Spawns a task answering requests on `remote` until the local side
    /// hangs up or the script disconnects.
    pub fn serve(self, mut remote: RemotePeer) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = remote.recv_request().await {
                if self.interleave_inventory {
                    remote.send(Message::InvRelayBlock(Hash::sha256(b"interleaved-inv")));
                }
                match request {
                    Message::RequestPruningPointProof => {
                        remote.send(Message::PruningPointProof(self.proof.clone()));
                    }
                    Message::RequestPruningPointAndItsAnticone => {
                        remote.send(Message::PruningPoints(self.pruning_points.clone()));
                        for block in &self.trusted_blocks {
                            remote.send(Message::BlockWithTrustedData(Box::new(block.clone())));
                        }
                        remote.send(Message::DoneBlocksWithTrustedData);
                    }
                    Message::RequestIbdHeaders {
                        ..
                    } => {
                        for block in &self.headers {
                            if self.omit_high_block && block.hash() == self.high_hash {
                                continue;
                            }
                            remote.send(Message::IbdBlock(block.clone()));
                        }
                        remote.send(Message::DoneHeaders);
                    }
                    Message::RequestPruningPointUtxoSet(_) => {
                        if self.unexpected_pruning_point {
                            remote.send(Message::UnexpectedPruningPoint);
                            continue;
                        }
                        if self.truncate_utxo {
                            if let Some(first) = self.utxo_chunks.first() {
                                remote.send(Message::PruningPointUtxoSetChunk(first.clone()));
                            }
                            // Drop the connection mid-stream.
                            return;
                        }
                        for chunk in &self.utxo_chunks {
                            remote.send(Message::PruningPointUtxoSetChunk(chunk.clone()));
                        }
                        remote.send(Message::DonePruningPointUtxoSet);
                    }
                    _ => {}
                }
            }
        })
    }
}
