//! Typed, timed request/response channel over a single peer route.
//!
//! [`PeerMessageChannel`] is the only transport surface the sync phases see:
//! a non-blocking send onto the outgoing route and a timed receive that
//! transparently skips relay-inventory frames interleaved by the peer.
//! Delivery preserves the peer's send order for frames of interest.
//!
//! Tag expectation happens at the call sites: each phase exhaustively matches
//! the small set of frames it accepts and converts any other variant into the
//! banning `UnexpectedMessage` protocol error.

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{timeout_at, Instant};
use tracing::trace;

use crate::error::{NetworkError, NetworkResult};
use crate::network::message::Message;

/// A typed channel to one peer, owned by the IBD session for its duration.
#[derive(Debug)]
pub struct PeerMessageChannel {
    outgoing: UnboundedSender<Message>,
    incoming: UnboundedReceiver<Message>,
}

impl PeerMessageChannel {
    /// Wraps the two halves of a peer route.
    ///
    /// The embedding node wires `incoming` from its message dispatcher and
    /// `outgoing` into the peer connection's write loop.
    pub fn new(outgoing: UnboundedSender<Message>, incoming: UnboundedReceiver<Message>) -> Self {
        Self {
            outgoing,
            incoming,
        }
    }

    /// Enqueues a message onto the outgoing route without blocking.
    pub fn send(&self, message: Message) -> NetworkResult<()> {
        self.outgoing.send(message).map_err(|_| NetworkError::PeerDisconnected)
    }

    /// Receives the next non-inventory message within `timeout`.
    ///
    /// Relay-inventory frames are discarded without consuming the deadline
    /// budget of the caller's expectation. `expected` names the frame the
    /// caller is waiting for, for timeout diagnostics only.
    pub async fn recv(&mut self, timeout: Duration, expected: &'static str) -> NetworkResult<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            let message = match timeout_at(deadline, self.incoming.recv()).await {
                Err(_) => {
                    return Err(NetworkError::Timeout {
                        timeout,
                        expected,
                    })
                }
                Ok(None) => return Err(NetworkError::PeerDisconnected),
                Ok(Some(message)) => message,
            };

            if message.is_inventory() {
                trace!("skipping interleaved {} frame while waiting for {}", message.cmd(), expected);
                continue;
            }

            return Ok(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::message::MessageType;
    use dagcore::Hash;
    use tokio::sync::mpsc::unbounded_channel;

    fn test_channel() -> (PeerMessageChannel, UnboundedSender<Message>, UnboundedReceiver<Message>) {
        let (out_tx, out_rx) = unbounded_channel();
        let (in_tx, in_rx) = unbounded_channel();
        (PeerMessageChannel::new(out_tx, in_rx), in_tx, out_rx)
    }

    #[tokio::test]
    async fn test_recv_preserves_order() {
        let (mut channel, in_tx, _out_rx) = test_channel();
        in_tx.send(Message::DoneHeaders).unwrap();
        in_tx.send(Message::DoneBlocksWithTrustedData).unwrap();

        let first = channel.recv(Duration::from_secs(1), "DoneHeaders").await.unwrap();
        let second = channel.recv(Duration::from_secs(1), "DoneBlocksWithTrustedData").await.unwrap();
        assert_eq!(first.message_type(), MessageType::DoneHeaders);
        assert_eq!(second.message_type(), MessageType::DoneBlocksWithTrustedData);
    }

    #[tokio::test]
    async fn test_recv_skips_inventory_frames() {
        let (mut channel, in_tx, _out_rx) = test_channel();
        in_tx.send(Message::InvRelayBlock(Hash::sha256(b"inv-1"))).unwrap();
        in_tx.send(Message::InvRelayBlock(Hash::sha256(b"inv-2"))).unwrap();
        in_tx.send(Message::DoneHeaders).unwrap();

        let message = channel.recv(Duration::from_secs(1), "DoneHeaders").await.unwrap();
        assert_eq!(message.message_type(), MessageType::DoneHeaders);
    }

    #[tokio::test]
    async fn test_recv_times_out() {
        let (mut channel, _in_tx, _out_rx) = test_channel();
        let err = channel.recv(Duration::from_millis(20), "PruningPoints").await.unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Timeout {
                expected: "PruningPoints",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_recv_reports_disconnect() {
        let (mut channel, in_tx, _out_rx) = test_channel();
        drop(in_tx);
        let err = channel.recv(Duration::from_secs(1), "PruningPoints").await.unwrap_err();
        assert!(matches!(err, NetworkError::PeerDisconnected));
    }

    #[tokio::test]
    async fn test_send_fails_when_route_is_dead() {
        let (channel, _in_tx, out_rx) = test_channel();
        drop(out_rx);
        assert!(matches!(channel.send(Message::RequestPruningPointProof), Err(NetworkError::PeerDisconnected)));
    }

    #[tokio::test]
    async fn test_send_enqueues_without_blocking() {
        let (channel, _in_tx, mut out_rx) = test_channel();
        channel.send(Message::RequestPruningPointAndItsAnticone).unwrap();
        assert_eq!(out_rx.recv().await.unwrap().message_type(), MessageType::RequestPruningPointAndItsAnticone);
    }
}
