//! Pruning point proof download and validation.

use dagcore::Hash;
use tracing::info;

use crate::config::IbdConfig;
use crate::consensus::{ConsensusApi, StagingConsensusApi};
use crate::error::{ConsensusError, IbdResult, ProtocolError};
use crate::network::message::{Message, MessageType};
use crate::network::PeerMessageChannel;

/// Downloads the pruning point proof, validates it against the live
/// consensus, and applies it to staging.
///
/// Returns the claimed pruning point: the hash of the last header of proof
/// level 0. Rule errors from proof validation are banning; infrastructure
/// errors pass through unchanged.
pub async fn sync_and_validate_pruning_point_proof(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    consensus: &dyn ConsensusApi,
    staging: &dyn StagingConsensusApi,
) -> IbdResult<Hash> {
    info!("Downloading the pruning point proof");
    channel.send(Message::RequestPruningPointProof)?;

    // Proof generation on the server side may take minutes; this is the one
    // receive with a dedicated long timeout.
    let message = channel.recv(config.proof_timeout, MessageType::PruningPointProof.cmd()).await?;
    let proof = match message {
        Message::PruningPointProof(proof) => proof,
        other => return Err(ProtocolError::unexpected(MessageType::PruningPointProof, &other).into()),
    };

    info!(
        "Received pruning point proof with {} headers across {} levels",
        proof.header_count(),
        proof.levels.len()
    );

    let Some(claimed_pruning_point) = proof.claimed_pruning_point() else {
        return Err(ProtocolError::EmptyPruningPointProof.into());
    };

    if let Err(err) = consensus.validate_pruning_point_proof(&proof) {
        return Err(match err {
            ConsensusError::Rule(rule) => ProtocolError::InvalidPruningPointProof(rule).into(),
            other => other.into(),
        });
    }

    staging.apply_pruning_point_proof(&proof)?;

    Ok(claimed_pruning_point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusDomain;
    use crate::error::IbdError;
    use crate::test_utils::{simnet_fixture, FixtureOptions};
    use dagcore::PruningPointProof;

    #[tokio::test]
    async fn test_unexpected_frame_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = crate::test_utils::peer_channel();
        remote.send(Message::DoneHeaders);

        let staging = fixture.domain.begin_staging().unwrap();
        let err = sync_and_validate_pruning_point_proof(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            IbdError::Protocol(ProtocolError::UnexpectedMessage {
                expected: "PruningPointProof",
                got: "DoneHeaders",
            })
        ));
        assert!(err.should_ban_peer());
    }

    #[tokio::test]
    async fn test_empty_proof_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = crate::test_utils::peer_channel();
        remote.send(Message::PruningPointProof(PruningPointProof::default()));

        let staging = fixture.domain.begin_staging().unwrap();
        let err = sync_and_validate_pruning_point_proof(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IbdError::Protocol(ProtocolError::EmptyPruningPointProof)));
    }

    #[tokio::test]
    async fn test_valid_proof_returns_claimed_pruning_point() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = crate::test_utils::peer_channel();
        remote.send(Message::PruningPointProof(fixture.server.proof.clone()));

        let staging = fixture.domain.begin_staging().unwrap();
        let claimed = sync_and_validate_pruning_point_proof(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
        )
        .await
        .unwrap();

        assert_eq!(claimed, fixture.pruning_point);
    }
}
