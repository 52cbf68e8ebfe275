//! Error types for the `rando-sync` binary.

use rando_tracker::HubError;

use crate::config::ConfigError;

/// Top-level error for the binary.
///
/// Wraps every failure `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The tracker hub could not be built or started.
    #[error("tracker hub error: {source}")]
    Hub {
        /// The underlying hub error.
        #[from]
        source: HubError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {0}")]
    Signal(std::io::Error),
}
