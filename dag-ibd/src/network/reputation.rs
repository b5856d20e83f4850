//! Per-peer misbehavior scoring.
//!
//! Protocol errors carry misbehavior weights that accumulate on a
//! [`PeerReputation`] record. Banning-classified violations are terminal on
//! their own; weighted scoring exists so the embedding node can also ban
//! peers that repeatedly cause low-grade failures (timeouts, graceful
//! aborts) without ever committing a provable violation.
//!
//! This module only scores and reports; connecting and disconnecting remain
//! the embedding node's responsibility.

use serde::{Deserialize, Serialize};

use crate::error::IbdError;

/// Misbehavior weights for session outcomes.
pub mod misbehavior_scores {
    /// Provable protocol violation (banning-classified error).
    pub const PROTOCOL_VIOLATION: i32 = 100;

    /// Finality conflict; the peer may simply be on another side of a split.
    pub const FINALITY_CONFLICT: i32 = 10;

    /// Timeout or dropped link mid-session.
    pub const INFRASTRUCTURE_FAILURE: i32 = 5;

    /// Completed session.
    pub const SUCCESSFUL_SESSION: i32 = -10;
}

/// Score at which the embedding node is advised to ban the peer.
pub const BAN_SCORE_THRESHOLD: i32 = 100;

/// Most positive (lowest) score a peer can accumulate.
const MIN_SCORE: i32 = -50;

/// Reputation record of a single peer across IBD sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerReputation {
    /// Current misbehavior score.
    pub score: i32,

    /// Completed sessions against this peer.
    pub successful_sessions: u64,

    /// Failed sessions against this peer.
    pub failed_sessions: u64,
}

impl PeerReputation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed session, weighting the error by its classification.
    pub fn record_failure(&mut self, error: &IbdError) {
        self.failed_sessions += 1;
        self.apply(Self::weight_for(error));
    }

    /// Records a session that completed (or aborted gracefully without an
    /// attributable error).
    pub fn record_success(&mut self) {
        self.successful_sessions += 1;
        self.apply(misbehavior_scores::SUCCESSFUL_SESSION);
    }

    /// Whether the accumulated score advises banning.
    pub fn should_ban(&self) -> bool {
        self.score >= BAN_SCORE_THRESHOLD
    }

    fn apply(&mut self, delta: i32) {
        self.score = (self.score + delta).max(MIN_SCORE);
    }

    fn weight_for(error: &IbdError) -> i32 {
        if error.should_ban_peer() {
            return misbehavior_scores::PROTOCOL_VIOLATION;
        }
        match error {
            IbdError::Protocol(_) => misbehavior_scores::FINALITY_CONFLICT,
            _ => misbehavior_scores::INFRASTRUCTURE_FAILURE,
        }
    }
}
