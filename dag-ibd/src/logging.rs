//! Logging initialization for embedders of the IBD engine.
//!
//! The engine itself only emits `tracing` events; process-level sinks belong
//! to the embedding node. This module offers a console initializer for
//! binaries and tests that have no subscriber of their own.

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    InitFailed(String),
}

/// Type alias for logging operation results.
pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

/// Configuration for console logging output.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Log level filter. If None, `RUST_LOG` is consulted and INFO is the
    /// fallback.
    pub level: Option<LevelFilter>,
    /// Whether to include event targets in the output.
    pub show_target: bool,
}

/// Initializes console-only logging with the given level.
pub fn init_console_logging(level: LevelFilter) -> LoggingResult<()> {
    init_logging(LoggingConfig {
        level: Some(level),
        show_target: false,
    })
}

/// Initializes console logging with the given configuration.
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> LoggingResult<()> {
    let env_filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.show_target)
        .try_init()
        .map_err(|err| LoggingError::InitFailed(err.to_string()))
}
