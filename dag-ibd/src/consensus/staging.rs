//! Owned handle over the staging consensus lifecycle.

use std::sync::Arc;

use tracing::debug;

use crate::consensus::{ConsensusDomain, StagingConsensusApi};
use crate::error::StagingResult;

/// Transactional overlay on the consensus store for one IBD session.
///
/// `init` acquires the single staging slot of the domain; `commit` and
/// `discard` consume the handle, so double-commit and use-after-discard are
/// type errors rather than runtime ones. A handle dropped without either
/// releases the slot and leaves cleanup of the staged data to the next
/// `init`, which is the non-recoverable-abort path where the session
/// deliberately skips cleanup.
pub struct StagingConsensus {
    domain: Arc<dyn ConsensusDomain>,
    api: Arc<dyn StagingConsensusApi>,
    resolved: bool,
}

impl StagingConsensus {
    /// Starts a staging overlay. Fails while another session owns one.
    pub fn init(domain: Arc<dyn ConsensusDomain>) -> StagingResult<Self> {
        let api = domain.begin_staging()?;
        debug!("staging consensus initialized");
        Ok(Self {
            domain,
            api,
            resolved: false,
        })
    }

    /// The mutation surface of the overlay.
    pub fn api(&self) -> &dyn StagingConsensusApi {
        self.api.as_ref()
    }

    /// Atomically promotes all staged state into the live consensus.
    pub fn commit(mut self) -> StagingResult<()> {
        self.resolved = true;
        self.domain.commit_staging()
    }

    /// Drops all staged effects, including imported-pruning-point scratch.
    pub fn discard(mut self) -> StagingResult<()> {
        self.resolved = true;
        self.domain.discard_staging()
    }
}

impl Drop for StagingConsensus {
    fn drop(&mut self) {
        if !self.resolved {
            debug!("staging consensus released without commit or discard");
            self.domain.release_staging();
        }
    }
}
