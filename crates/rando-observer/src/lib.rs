//! Observer client for remote randomizer matches.
//!
//! Keeps a local [`Match`](rando_types::Match) projection per watched game,
//! fed by a reconnecting observer socket (`{ws_base}/observers/{game_id}`)
//! and seeded over REST.
//!
//! # Modules
//!
//! - [`client`] -- Per-game connection supervisor and the public client
//! - [`config`] -- Endpoint and retry settings
//! - [`error`] -- [`ObserverError`]
//! - [`fetch`] -- REST seeding (`/games/{id}`, `/bingo/{id}`)
//! - [`state`] -- Match table and its reducers

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod state;

pub use client::{ConnectionState, ObserverClient};
pub use config::ObserverConfig;
pub use error::ObserverError;
pub use fetch::{FetchedBingo, FetchedMatch, MatchFetcher};
pub use state::MatchTable;
