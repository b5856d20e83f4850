//! Configuration for the IBD-HP engine.

use std::time::Duration;

use dagcore::Params;

/// Configuration for a single IBD session.
#[derive(Clone, Debug)]
pub struct IbdConfig {
    /// Consensus parameters of the network being synced.
    pub params: Params,

    /// Default timeout for a single expected message.
    pub message_timeout: Duration,

    /// Timeout for the pruning point proof response. Proof generation on the
    /// server side can take minutes, so this is much longer than the
    /// per-message default.
    pub proof_timeout: Duration,
}

impl IbdConfig {
    /// Creates a configuration with default timeouts for the given network.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            message_timeout: Duration::from_secs(30),
            proof_timeout: Duration::from_secs(600),
        }
    }

    /// Mainnet configuration with default timeouts.
    pub fn mainnet() -> Self {
        Self::new(Params::mainnet())
    }

    /// Sets the per-message timeout.
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    /// Sets the pruning point proof timeout.
    pub fn with_proof_timeout(mut self, timeout: Duration) -> Self {
        self.proof_timeout = timeout;
        self
    }
}

impl Default for IbdConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}
