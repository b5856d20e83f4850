//! End-to-end IBD-HP sessions against a scripted remote peer.

use std::sync::Arc;
use std::time::Duration;

use dag_ibd::test_utils::{peer_channel, simnet_fixture, CountingOverrideHandler, Fixture, FixtureOptions, ScriptedServer};
use dag_ibd::{IbdController, IbdError, IbdPhase, NetworkError, ProtocolError};

fn launch(fixture: &Fixture, server: ScriptedServer, hook: Arc<CountingOverrideHandler>) -> IbdController {
    let (channel, remote) = peer_channel();
    server.serve(remote);
    IbdController::new(fixture.config.clone(), fixture.domain.clone(), channel, hook)
}

#[tokio::test]
async fn test_happy_path_commits_staging_and_fires_hook_once() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, fixture.server.clone(), hook.clone());

    controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap();

    assert_eq!(controller.last_session().unwrap().phase(), IbdPhase::Committed);
    assert_eq!(controller.last_session().unwrap().proof_pruning_point, Some(fixture.pruning_point));

    // Live consensus reflects the committed session.
    assert!(fixture.domain.live_block_exists(&fixture.high_hash));
    assert_eq!(fixture.domain.live_pruning_point(), fixture.pruning_point);
    assert!(fixture.domain.live_utxo_installed());

    assert_eq!(hook.calls(), 1);
    assert!(!fixture.domain.staging_active());
    assert!(fixture.domain.imported_utxo_clear_count() >= 1);
    assert!(!controller.peer_reputation().should_ban());
}

#[tokio::test]
async fn test_inventory_frames_are_skipped_throughout() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let mut server = fixture.server.clone();
    server.interleave_inventory = true;
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, server, hook.clone());

    controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap();
    assert_eq!(hook.calls(), 1);
}

#[tokio::test]
async fn test_genesis_pruning_point_is_banned() {
    let fixture = simnet_fixture(FixtureOptions {
        claim_genesis: true,
        ..FixtureOptions::default()
    });
    let live_headers_before = fixture.domain.live_header_count();
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, fixture.server.clone(), hook.clone());

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(err, IbdError::Protocol(ProtocolError::GenesisPruningPoint)));
    assert!(err.should_ban_peer());

    // Staging was discarded; no effect is observable.
    assert!(!fixture.domain.staging_active());
    assert_eq!(fixture.domain.live_header_count(), live_headers_before);
    assert_eq!(hook.calls(), 0);
    assert!(controller.peer_reputation().should_ban());
}

#[tokio::test]
async fn test_missing_triggering_block_is_banned() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let mut server = fixture.server.clone();
    server.omit_high_block = true;
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, server, hook.clone());

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(err, IbdError::Protocol(ProtocolError::MissingTriggeringBlock)));
    assert!(err.should_ban_peer());
    assert!(!fixture.domain.staging_active());
    assert!(!fixture.domain.live_block_exists(&fixture.high_hash));
}

#[tokio::test]
async fn test_pruning_points_list_mismatch_is_banned() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let mut server = fixture.server.clone();
    server.pruning_points.pop();
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, server, hook);

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(err, IbdError::Protocol(ProtocolError::PruningPointsListMismatch)));
    assert!(err.should_ban_peer());
    assert!(controller.peer_reputation().should_ban());
    assert!(!fixture.domain.staging_active());
}

#[tokio::test]
async fn test_utxo_truncation_aborts_without_banning() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let mut server = fixture.server.clone();
    server.truncate_utxo = true;
    let live_headers_before = fixture.domain.live_header_count();
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, server, hook.clone());

    // A truncated UTXO transfer ends the session without error and without
    // promoting staging.
    controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap();

    assert_eq!(controller.last_session().unwrap().phase(), IbdPhase::Aborted);
    assert_eq!(hook.calls(), 0);
    assert_eq!(fixture.domain.live_header_count(), live_headers_before);
    assert!(!fixture.domain.live_utxo_installed());
    assert!(fixture.domain.imported_utxo_clear_count() >= 1);
    assert!(!fixture.domain.staging_active());
    assert!(!controller.peer_reputation().should_ban());
}

#[tokio::test]
async fn test_finality_conflict_is_recoverable_and_not_banned() {
    let fixture = simnet_fixture(FixtureOptions {
        finality_violation: true,
        ..FixtureOptions::default()
    });
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, fixture.server.clone(), hook.clone());

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(err, IbdError::Protocol(ProtocolError::PruningPointsViolateFinality)));
    assert!(!err.should_ban_peer());
    assert!(err.is_recoverable());

    assert!(!fixture.domain.staging_active());
    assert_eq!(hook.calls(), 0);
    assert!(!controller.peer_reputation().should_ban());
}

#[tokio::test]
async fn test_invalid_proof_is_banned() {
    let fixture = simnet_fixture(FixtureOptions {
        proof_rule_error: true,
        ..FixtureOptions::default()
    });
    let hook = Arc::new(CountingOverrideHandler::default());
    let mut controller = launch(&fixture, fixture.server.clone(), hook);

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(err, IbdError::Protocol(ProtocolError::InvalidPruningPointProof(_))));
    assert!(err.should_ban_peer());
    assert!(!fixture.domain.staging_active());
}

#[tokio::test]
async fn test_unexpected_message_is_banned() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let (channel, remote) = peer_channel();
    remote.send(dag_ibd::Message::DoneHeaders);
    let mut controller =
        IbdController::new(fixture.config.clone(), fixture.domain.clone(), channel, Arc::new(()));

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(
        err,
        IbdError::Protocol(ProtocolError::UnexpectedMessage {
            expected: "PruningPointProof",
            got: "DoneHeaders",
        })
    ));
    assert!(err.should_ban_peer());
    assert!(!fixture.domain.staging_active());
}

#[tokio::test]
async fn test_silent_peer_times_out_recoverably() {
    let fixture = simnet_fixture(FixtureOptions::default());
    let (channel, _remote) = peer_channel();
    let mut controller = IbdController::new(
        fixture.config.clone().with_proof_timeout(Duration::from_millis(50)),
        fixture.domain.clone(),
        channel,
        Arc::new(()),
    );

    let err = controller.ibd_with_headers_proof(fixture.high_hash).await.unwrap_err();
    assert!(matches!(err, IbdError::Network(NetworkError::Timeout { .. })));
    assert!(err.is_recoverable());
    assert!(!err.should_ban_peer());
    assert!(!fixture.domain.staging_active());
}
