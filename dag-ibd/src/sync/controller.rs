//! Top-level IBD-HP state machine.
//!
//! The controller gates whether a relayed tip justifies a headers-proof IBD,
//! owns the staging lifecycle for the session, runs the phases in order, and
//! classifies errors on the way out: recoverable failures discard staging
//! and surface to the caller for a retry against another peer, while
//! non-recoverable failures propagate without cleanup because the connection
//! is being torn down anyway.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dagcore::{Block, Hash};
use tracing::{debug, info, warn};

use crate::config::IbdConfig;
use crate::consensus::{ConsensusDomain, StagingConsensus};
use crate::error::{ConsensusResult, IbdResult};
use crate::network::{PeerMessageChannel, PeerReputation};
use crate::sync::{headers, proof, utxo};

/// Downstream hook fired exactly once when a session successfully installs a
/// new pruning-point UTXO set. Implementations must be idempotent across
/// session retries.
#[async_trait]
pub trait UtxoSetOverrideHandler: Send + Sync {
    async fn on_pruning_point_utxo_set_override(&self) -> ConsensusResult<()>;
}

/// No-op handler for embeddings without downstream notifications.
#[async_trait]
impl UtxoSetOverrideHandler for () {
    async fn on_pruning_point_utxo_set_override(&self) -> ConsensusResult<()> {
        Ok(())
    }
}

/// Phase of an IBD session, for logging and introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IbdPhase {
    Init,
    ProofRequested,
    ProofValidated,
    AnticoneSyncing,
    HeadersSyncing,
    UtxoSyncing,
    Committed,
    Aborted,
}

impl IbdPhase {
    pub fn name(&self) -> &'static str {
        match self {
            IbdPhase::Init => "Init",
            IbdPhase::ProofRequested => "ProofRequested",
            IbdPhase::ProofValidated => "ProofValidated",
            IbdPhase::AnticoneSyncing => "AnticoneSyncing",
            IbdPhase::HeadersSyncing => "HeadersSyncing",
            IbdPhase::UtxoSyncing => "UtxoSyncing",
            IbdPhase::Committed => "Committed",
            IbdPhase::Aborted => "Aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IbdPhase::Committed | IbdPhase::Aborted)
    }
}

impl fmt::Display for IbdPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-attempt session state.
#[derive(Debug)]
pub struct IbdSession {
    pub high_hash: Hash,
    pub proof_pruning_point: Option<Hash>,
    phase: IbdPhase,
}

impl IbdSession {
    fn new(high_hash: Hash) -> Self {
        Self {
            high_hash,
            proof_pruning_point: None,
            phase: IbdPhase::Init,
        }
    }

    pub fn phase(&self) -> IbdPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: IbdPhase) {
        info!("IBD session for {}: {} -> {}", self.high_hash, self.phase, phase);
        self.phase = phase;
    }
}

/// Drives a headers-proof IBD session against a single peer.
pub struct IbdController {
    config: IbdConfig,
    domain: Arc<dyn ConsensusDomain>,
    channel: PeerMessageChannel,
    hook: Arc<dyn UtxoSetOverrideHandler>,
    reputation: PeerReputation,
    last_session: Option<IbdSession>,
}

impl IbdController {
    pub fn new(
        config: IbdConfig,
        domain: Arc<dyn ConsensusDomain>,
        channel: PeerMessageChannel,
        hook: Arc<dyn UtxoSetOverrideHandler>,
    ) -> Self {
        Self {
            config,
            domain,
            channel,
            hook,
            reputation: PeerReputation::new(),
            last_session: None,
        }
    }

    /// The gate preceding IBD-HP launch.
    ///
    /// Returns `(should_download_headers_proof, should_sync)`. When the block
    /// locator negotiation found a shared block, a normal header sync
    /// suffices. Otherwise a headers-proof download is warranted only when
    /// the relayed tip dominates the local headers-selected tip by more than
    /// one pruning window in blue score with strictly more blue work.
    pub fn should_sync_and_should_download_headers_proof(
        &self,
        high_block: &Block,
        highest_shared_block_found: bool,
    ) -> IbdResult<(bool, bool)> {
        if highest_shared_block_found {
            return Ok((false, true));
        }

        let consensus = self.domain.consensus();
        let headers_selected_tip = consensus.get_headers_selected_tip()?;
        let tip_info = consensus.get_block_info(&headers_selected_tip)?;

        if high_block.header.blue_score < tip_info.blue_score + self.config.params.pruning_depth {
            return Ok((false, false));
        }
        if high_block.header.blue_work <= tip_info.blue_work {
            return Ok((false, false));
        }

        Ok((true, true))
    }

    /// Runs a full IBD-HP session for `high_hash`.
    ///
    /// On success staging is committed. A gracefully aborted UTXO transfer
    /// returns `Ok(())` without committing; the peer is not punished.
    pub async fn ibd_with_headers_proof(&mut self, high_hash: Hash) -> IbdResult<()> {
        let mut session = IbdSession::new(high_hash);
        let result = self.run_session(&mut session).await;
        match &result {
            Ok(()) => {
                if session.phase() == IbdPhase::Committed {
                    self.reputation.record_success();
                }
            }
            Err(err) => {
                warn!(
                    "IBD session for {} failed in phase {}: {} (banning: {}, recoverable: {})",
                    session.high_hash,
                    session.phase(),
                    err,
                    err.should_ban_peer(),
                    err.is_recoverable()
                );
                self.reputation.record_failure(err);
            }
        }
        self.last_session = Some(session);
        result
    }

    /// Reputation accumulated against this peer, for the banning policy.
    pub fn peer_reputation(&self) -> &PeerReputation {
        &self.reputation
    }

    /// State of the most recently finished session.
    pub fn last_session(&self) -> Option<&IbdSession> {
        self.last_session.as_ref()
    }

    async fn run_session(&mut self, session: &mut IbdSession) -> IbdResult<()> {
        let staging = StagingConsensus::init(self.domain.clone())?;

        match self.download_headers_and_pruning_utxo_set(session, &staging).await {
            Ok(true) => {
                staging.commit()?;
                session.set_phase(IbdPhase::Committed);
                Ok(())
            }
            Ok(false) => {
                // The scoped cleanup in the UTXO phase already ran; the
                // staging slot is released when the handle drops.
                debug!("Aborting IBD because the pruning point UTXO set failed to sync");
                session.set_phase(IbdPhase::Aborted);
                Ok(())
            }
            Err(err) => {
                session.set_phase(IbdPhase::Aborted);
                if err.is_recoverable() {
                    staging.discard()?;
                }
                Err(err)
            }
        }
    }

    async fn download_headers_and_pruning_utxo_set(
        &mut self,
        session: &mut IbdSession,
        staging: &StagingConsensus,
    ) -> IbdResult<bool> {
        let consensus = self.domain.consensus();

        session.set_phase(IbdPhase::ProofRequested);
        let proof_pruning_point = proof::sync_and_validate_pruning_point_proof(
            &mut self.channel,
            &self.config,
            consensus.as_ref(),
            staging.api(),
        )
        .await?;
        session.proof_pruning_point = Some(proof_pruning_point);
        session.set_phase(IbdPhase::ProofValidated);

        session.set_phase(IbdPhase::AnticoneSyncing);
        headers::sync_pruning_points_and_anticone(
            &mut self.channel,
            &self.config,
            consensus.as_ref(),
            staging.api(),
            proof_pruning_point,
        )
        .await?;

        headers::guard_genesis_pruning_point(&self.config.params, proof_pruning_point)?;

        session.set_phase(IbdPhase::HeadersSyncing);
        headers::sync_pruning_point_future_headers(
            &mut self.channel,
            &self.config,
            staging.api(),
            proof_pruning_point,
            session.high_hash,
        )
        .await?;
        info!("Headers downloaded up to {}", session.high_hash);

        headers::validate_staged_timestamps(&self.config.params, consensus.as_ref(), staging.api())?;

        session.set_phase(IbdPhase::UtxoSyncing);
        debug!("Syncing the current pruning point UTXO set");
        let synced = utxo::sync_pruning_point_utxo_set(
            &mut self.channel,
            &self.config,
            staging.api(),
            self.hook.as_ref(),
            proof_pruning_point,
        )
        .await?;
        if !synced {
            return Ok(false);
        }
        debug!("Finished syncing the current pruning point UTXO set");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{peer_channel, simnet_fixture, FixtureOptions};
    use dagcore::BlueWork;

    fn controller_for(fixture: &crate::test_utils::Fixture) -> IbdController {
        let (channel, _remote) = peer_channel();
        IbdController::new(fixture.config.clone(), fixture.domain.clone(), channel, Arc::new(()))
    }

    #[test]
    fn test_gate_shared_block_means_normal_sync() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let controller = controller_for(&fixture);
        let high_block = fixture.high_block.clone();

        let (download, sync) =
            controller.should_sync_and_should_download_headers_proof(&high_block, true).unwrap();
        assert!(!download);
        assert!(sync);
    }

    #[test]
    fn test_gate_accepts_dominating_tip() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let controller = controller_for(&fixture);

        let (download, sync) =
            controller.should_sync_and_should_download_headers_proof(&fixture.high_block, false).unwrap();
        assert!(download);
        assert!(sync);
    }

    #[test]
    fn test_gate_rejects_insufficient_blue_score() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let controller = controller_for(&fixture);

        let mut shallow = fixture.high_block.clone();
        shallow.header.blue_score = fixture.local_tip_blue_score + 1;

        let (download, sync) =
            controller.should_sync_and_should_download_headers_proof(&shallow, false).unwrap();
        assert!(!download);
        assert!(!sync);
    }

    #[test]
    fn test_gate_rejects_insufficient_blue_work() {
        let fixture = simnet_fixture(FixtureOptions::default());
        let controller = controller_for(&fixture);

        let mut light = fixture.high_block.clone();
        light.header.blue_work = BlueWork::zero();

        let (download, sync) =
            controller.should_sync_and_should_download_headers_proof(&light, false).unwrap();
        assert!(!download);
        assert!(!sync);
    }

    #[test]
    fn test_phase_names_are_distinct() {
        let phases = [
            IbdPhase::Init,
            IbdPhase::ProofRequested,
            IbdPhase::ProofValidated,
            IbdPhase::AnticoneSyncing,
            IbdPhase::HeadersSyncing,
            IbdPhase::UtxoSyncing,
            IbdPhase::Committed,
            IbdPhase::Aborted,
        ];
        for pair in phases.windows(2) {
            assert_ne!(pair[0].name(), pair[1].name());
        }
        assert!(IbdPhase::Committed.is_terminal());
        assert!(IbdPhase::Aborted.is_terminal());
        assert!(!IbdPhase::UtxoSyncing.is_terminal());
    }
}
