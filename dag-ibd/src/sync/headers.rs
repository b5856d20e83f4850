//! Pruning-point chain, anticone, and future-headers transfer.
//!
//! Phases, in order: past pruning points and the pruning point anticone with
//! trusted metadata, the genesis-as-pruning-point guard, all headers from the
//! new pruning point up to the triggering tip, and the timestamp window
//! validation over the imported chain.

use dagcore::{BlockWithTrustedData, Hash, Header, Params};
use tracing::{debug, info};

use crate::config::IbdConfig;
use crate::consensus::{ConsensusApi, StagingConsensusApi};
use crate::error::{ConsensusError, IbdResult, ProtocolError};
use crate::network::message::{Message, MessageType};
use crate::network::PeerMessageChannel;
use crate::sync::progress::StreamProgressReporter;

/// Phase A: downloads the historical pruning-point chain and the anticone of
/// the new pruning point with trusted metadata.
pub async fn sync_pruning_points_and_anticone(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    consensus: &dyn ConsensusApi,
    staging: &dyn StagingConsensusApi,
    proof_pruning_point: Hash,
) -> IbdResult<()> {
    info!("Downloading the past pruning points and the pruning point anticone");
    channel.send(Message::RequestPruningPointAndItsAnticone)?;

    validate_and_insert_pruning_points(channel, config, consensus, staging, proof_pruning_point).await?;

    // The first trusted-data block must be the pruning point itself.
    let Some(pruning_point_with_metadata) = receive_block_with_trusted_data(channel, config).await? else {
        return Err(ProtocolError::EmptyTrustedDataStream.into());
    };
    if pruning_point_with_metadata.hash() != proof_pruning_point {
        return Err(ProtocolError::TrustedDataRootMismatch.into());
    }

    let mut progress = StreamProgressReporter::new("blocks with trusted data");
    process_block_with_trusted_data(staging, *pruning_point_with_metadata)?;
    progress.add(1);

    while let Some(block) = receive_block_with_trusted_data(channel, config).await? {
        process_block_with_trusted_data(staging, *block)?;
        progress.add(1);
    }

    progress.finish();
    info!("Finished downloading pruning point and its anticone");
    Ok(())
}

/// Phase B: an explicit short-circuit for the corner case the general
/// finality check cannot distinguish.
//
// TODO: Remove this condition once there's a more proper way to check
// finality violation in the headers proof.
pub fn guard_genesis_pruning_point(params: &Params, proof_pruning_point: Hash) -> IbdResult<()> {
    if proof_pruning_point == params.genesis_hash {
        return Err(ProtocolError::GenesisPruningPoint.into());
    }
    Ok(())
}

/// Phase C: streams all headers from `pruning_point` (exclusive) up to and
/// including `high_hash` into staging, then asserts the triggering block
/// arrived.
pub async fn sync_pruning_point_future_headers(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    staging: &dyn StagingConsensusApi,
    pruning_point: Hash,
    high_hash: Hash,
) -> IbdResult<()> {
    debug!("Downloading headers from the pruning point {} up to {}", pruning_point, high_hash);
    channel.send(Message::RequestIbdHeaders {
        low: pruning_point,
        high: high_hash,
    })?;

    let mut progress = StreamProgressReporter::new("headers");
    loop {
        let message = channel.recv(config.message_timeout, MessageType::IbdBlock.cmd()).await?;
        match message {
            Message::IbdBlock(block) => {
                if let Err(err) = staging.validate_and_insert_block(block) {
                    return Err(match err {
                        ConsensusError::Rule(rule) => ProtocolError::InvalidBlockData(rule).into(),
                        other => other.into(),
                    });
                }
                progress.add(1);
            }
            Message::DoneHeaders => break,
            other => return Err(ProtocolError::unexpected(MessageType::IbdBlock, &other).into()),
        }
    }
    progress.finish();

    if !staging.get_block_info(&high_hash)?.exists {
        return Err(ProtocolError::MissingTriggeringBlock.into());
    }

    Ok(())
}

/// Phase D: requires the staged headers-selected tip to lead the local tip
/// by at least the network's deviation window. A chain that crossed the
/// launch gate in blue work but whose tip timestamp barely advances past the
/// local tip is not an acceptable sync target.
pub fn validate_staged_timestamps(
    params: &Params,
    consensus: &dyn ConsensusApi,
    staging: &dyn StagingConsensusApi,
) -> IbdResult<()> {
    let local_timestamp = selected_tip_timestamp(consensus)?;
    let staged_timestamp = selected_tip_timestamp(staging)?;

    if staged_timestamp < local_timestamp + params.timestamp_deviation_window_ms() {
        return Err(ProtocolError::StagedTimestampsTooOld.into());
    }
    Ok(())
}

fn selected_tip_timestamp<C: ConsensusApi + ?Sized>(consensus: &C) -> IbdResult<u64> {
    let tip = consensus.get_headers_selected_tip()?;
    let header = consensus
        .get_header(&tip)?
        .ok_or_else(|| ConsensusError::Store(format!("headers selected tip {} has no stored header", tip)))?;
    Ok(header.timestamp)
}

async fn validate_and_insert_pruning_points(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    consensus: &dyn ConsensusApi,
    staging: &dyn StagingConsensusApi,
    proof_pruning_point: Hash,
) -> IbdResult<()> {
    // A peer offering our own pruning point has nothing we need.
    let current_pruning_point = consensus.pruning_point()?;
    if current_pruning_point == proof_pruning_point {
        return Err(ProtocolError::SamePruningPoint.into());
    }

    let pruning_points = receive_pruning_points(channel, config).await?;

    match pruning_points.last() {
        Some(last) if last.hash() == proof_pruning_point => {}
        _ => return Err(ProtocolError::PruningPointsListMismatch.into()),
    }

    match pruning_points.first() {
        Some(first) if first.hash() == config.params.genesis_hash => {}
        _ => return Err(ProtocolError::PruningPointsListNotGenesisAnchored.into()),
    }

    if consensus.are_pruning_points_violating_finality(&pruning_points)? {
        return Err(ProtocolError::PruningPointsViolateFinality.into());
    }

    staging.import_pruning_points(&pruning_points)?;
    Ok(())
}

async fn receive_pruning_points(channel: &mut PeerMessageChannel, config: &IbdConfig) -> IbdResult<Vec<Header>> {
    let message = channel.recv(config.message_timeout, MessageType::PruningPoints.cmd()).await?;
    match message {
        Message::PruningPoints(headers) => Ok(headers),
        other => Err(ProtocolError::unexpected(MessageType::PruningPoints, &other).into()),
    }
}

async fn receive_block_with_trusted_data(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
) -> IbdResult<Option<Box<BlockWithTrustedData>>> {
    let message = channel.recv(config.message_timeout, MessageType::BlockWithTrustedData.cmd()).await?;
    match message {
        Message::BlockWithTrustedData(block) => Ok(Some(block)),
        Message::DoneBlocksWithTrustedData => Ok(None),
        other => Err(ProtocolError::unexpected(MessageType::BlockWithTrustedData, &other).into()),
    }
}

fn process_block_with_trusted_data(staging: &dyn StagingConsensusApi, block: BlockWithTrustedData) -> IbdResult<()> {
    match staging.validate_and_insert_block_with_trusted_data(block, false) {
        Ok(()) => Ok(()),
        Err(ConsensusError::Rule(rule)) => Err(ProtocolError::InvalidBlockData(rule).into()),
        Err(other) => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusDomain;
    use crate::error::IbdError;
    use crate::test_utils::{make_header, peer_channel, simnet_fixture, FixtureOptions};

    #[test]
    fn test_staged_tip_must_lead_local_tip() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let consensus = fixture.domain.consensus();
        let staging = fixture.domain.begin_staging().unwrap();

        let local_tip = consensus.get_headers_selected_tip().unwrap();
        let local_timestamp = consensus.get_header(&local_tip).unwrap().unwrap().timestamp;

        // A staged tip only marginally ahead of the local tip is rejected.
        let mut laggard = make_header(vec![], 300, 7_000_000);
        laggard.timestamp = local_timestamp + 1_000;
        staging.import_pruning_points(&[laggard]).unwrap();

        let err = validate_staged_timestamps(&fixture.config.params, consensus.as_ref(), staging.as_ref())
            .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::StagedTimestampsTooOld)));
        assert!(err.should_ban_peer());

        // A staged tip leading by the full deviation window passes.
        let mut leader = make_header(vec![], 301, 7_000_001);
        leader.timestamp = local_timestamp + fixture.config.params.timestamp_deviation_window_ms();
        staging.import_pruning_points(&[leader]).unwrap();

        assert!(validate_staged_timestamps(&fixture.config.params, consensus.as_ref(), staging.as_ref()).is_ok());
    }

    #[test]
    fn test_genesis_pruning_point_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let err = guard_genesis_pruning_point(&fixture.config.params, fixture.config.params.genesis_hash).unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::GenesisPruningPoint)));
        assert!(err.should_ban_peer());

        assert!(guard_genesis_pruning_point(&fixture.config.params, fixture.pruning_point).is_ok());
    }

    #[tokio::test]
    async fn test_same_pruning_point_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, _remote) = peer_channel();
        let staging = fixture.domain.begin_staging().unwrap();

        let current = fixture.domain.consensus().pruning_point().unwrap();
        let err = validate_and_insert_pruning_points(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
            current,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::SamePruningPoint)));
    }

    #[tokio::test]
    async fn test_pruning_points_list_mismatch_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = peer_channel();
        let staging = fixture.domain.begin_staging().unwrap();

        // Serve a list whose last element is not the claimed pruning point.
        let mut list = fixture.server.pruning_points.clone();
        list.pop();
        remote.send(Message::PruningPoints(list));

        let err = validate_and_insert_pruning_points(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
            fixture.pruning_point,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::PruningPointsListMismatch)));
    }

    #[tokio::test]
    async fn test_unanchored_pruning_points_list_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = peer_channel();
        let staging = fixture.domain.begin_staging().unwrap();

        // Drop genesis from the front of the list.
        let list = fixture.server.pruning_points[1..].to_vec();
        remote.send(Message::PruningPoints(list));

        let err = validate_and_insert_pruning_points(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
            fixture.pruning_point,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::PruningPointsListNotGenesisAnchored)));
    }

    #[tokio::test]
    async fn test_finality_violation_is_not_banning() {
        let fixture = simnet_fixture(FixtureOptions {
            finality_violation: true,
            ..FixtureOptions::default()
        });
        let (mut channel, remote) = peer_channel();
        let staging = fixture.domain.begin_staging().unwrap();
        remote.send(Message::PruningPoints(fixture.server.pruning_points.clone()));

        let err = validate_and_insert_pruning_points(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
            fixture.pruning_point,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::PruningPointsViolateFinality)));
        assert!(!err.should_ban_peer());
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_done_before_pruning_point_is_banning() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = peer_channel();
        let staging = fixture.domain.begin_staging().unwrap();

        remote.send(Message::PruningPoints(fixture.server.pruning_points.clone()));
        remote.send(Message::DoneBlocksWithTrustedData);

        let err = sync_pruning_points_and_anticone(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
            fixture.pruning_point,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::EmptyTrustedDataStream)));
    }

    #[tokio::test]
    async fn test_first_trusted_block_must_be_pruning_point() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let (mut channel, remote) = peer_channel();
        let staging = fixture.domain.begin_staging().unwrap();

        remote.send(Message::PruningPoints(fixture.server.pruning_points.clone()));
        // Send an anticone block first instead of the pruning point.
        let wrong_first = fixture.server.trusted_blocks.last().unwrap().clone();
        remote.send(Message::BlockWithTrustedData(Box::new(wrong_first)));

        let err = sync_pruning_points_and_anticone(
            &mut channel,
            &fixture.config,
            fixture.domain.consensus().as_ref(),
            staging.as_ref(),
            fixture.pruning_point,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IbdError::Protocol(ProtocolError::TrustedDataRootMismatch)));
    }
}
