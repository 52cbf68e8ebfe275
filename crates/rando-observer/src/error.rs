//! Error types for the observer client.

use rando_types::GameId;

/// Errors surfaced by [`ObserverClient`](crate::ObserverClient) and
/// [`MatchFetcher`](crate::MatchFetcher).
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The connection never opened within the retry ceiling.
    #[error("game {game_id}: gave up after {attempts} connection attempts")]
    RetryExhausted {
        /// Game being watched.
        game_id: GameId,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Watching was stopped before the connection opened.
    #[error("game {game_id}: watching stopped")]
    Stopped {
        /// Game being watched.
        game_id: GameId,
    },

    /// A REST call to the match server failed.
    #[error("match server request failed: {0}")]
    Http(#[from] reqwest::Error),
}
