//! The IBD-HP synchronization phases and their controller.

pub mod controller;
pub mod headers;
pub mod progress;
pub mod proof;
pub mod utxo;

pub use controller::{IbdController, IbdPhase, IbdSession, UtxoSetOverrideHandler};
