//! Pruning-point UTXO set transfer and installation.

use dagcore::Hash;
use tracing::{debug, info, warn};

use crate::config::IbdConfig;
use crate::consensus::StagingConsensusApi;
use crate::sync::controller::UtxoSetOverrideHandler;
use crate::error::{ConsensusError, IbdResult, NetworkError, ProtocolError, RuleError};
use crate::network::message::{Message, MessageType};
use crate::network::PeerMessageChannel;
use crate::sync::progress::StreamProgressReporter;

/// Clears the imported-pruning-point scratch on every exit path of the
/// transfer, including unwinds. A failing clear is a process-level invariant
/// violation and aborts.
struct ImportedUtxoDataGuard<'a> {
    staging: &'a dyn StagingConsensusApi,
}

impl Drop for ImportedUtxoDataGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.staging.clear_imported_pruning_point_data() {
            panic!("failed to clear imported pruning point data: {}", err);
        }
    }
}

/// Streams, validates, and installs the pruning-point UTXO set.
///
/// Returns `Ok(false)` on the two graceful-abort outcomes: an interrupted or
/// refused transfer, and a finality conflict during installation. Neither
/// punishes the peer; the session simply ends without promoting staging.
pub async fn sync_pruning_point_utxo_set(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    staging: &dyn StagingConsensusApi,
    hook: &dyn UtxoSetOverrideHandler,
    pruning_point: Hash,
) -> IbdResult<bool> {
    info!("Checking if the suggested pruning point {} is compatible with the node DAG", pruning_point);
    if !staging.is_valid_pruning_point(&pruning_point)? {
        return Err(ProtocolError::InvalidPruningPoint(pruning_point).into());
    }

    info!("Fetching the pruning point UTXO set");
    let fetched = fetch_missing_utxo_set(channel, config, staging, hook, pruning_point).await?;
    if !fetched {
        info!("Could not fetch the pruning point UTXO set");
        return Ok(false);
    }

    info!("Fetched the new pruning point UTXO set");
    Ok(true)
}

async fn fetch_missing_utxo_set(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    staging: &dyn StagingConsensusApi,
    hook: &dyn UtxoSetOverrideHandler,
    pruning_point: Hash,
) -> IbdResult<bool> {
    let _guard = ImportedUtxoDataGuard {
        staging,
    };

    channel.send(Message::RequestPruningPointUtxoSet(pruning_point))?;

    let received_all = receive_and_insert_utxo_set(channel, config, staging).await?;
    if !received_all {
        return Ok(false);
    }

    match staging.validate_and_insert_imported_pruning_point(&pruning_point) {
        Ok(()) => {}
        Err(ConsensusError::Rule(RuleError::SuggestedPruningViolatesFinality)) => {
            debug!("the suggested pruning point {} violates finality, aborting without banning", pruning_point);
            return Ok(false);
        }
        Err(ConsensusError::Rule(rule)) => {
            return Err(ProtocolError::InvalidImportedUtxoSet(rule).into());
        }
        Err(other) => return Err(other.into()),
    }

    hook.on_pruning_point_utxo_set_override().await?;

    Ok(true)
}

async fn receive_and_insert_utxo_set(
    channel: &mut PeerMessageChannel,
    config: &IbdConfig,
    staging: &dyn StagingConsensusApi,
) -> IbdResult<bool> {
    let mut progress = StreamProgressReporter::new("UTXO set entries");
    loop {
        let message = match channel.recv(config.message_timeout, MessageType::PruningPointUtxoSetChunk.cmd()).await {
            Ok(message) => message,
            Err(NetworkError::PeerDisconnected) => {
                warn!("UTXO set transfer interrupted after {} entries", progress.processed());
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        match message {
            Message::PruningPointUtxoSetChunk(pairs) => {
                let count = pairs.len() as u64;
                staging.append_imported_pruning_point_utxos(&pairs)?;
                progress.add(count);
            }
            Message::DonePruningPointUtxoSet => {
                progress.finish();
                return Ok(true);
            }
            Message::UnexpectedPruningPoint => {
                debug!("the peer no longer has the requested pruning point UTXO set");
                return Ok(false);
            }
            other => return Err(ProtocolError::unexpected(MessageType::PruningPointUtxoSetChunk, &other).into()),
        }
    }
}
