//! Observer client configuration.

use rando_types::{GameId, UserId};
use serde::Deserialize;

/// Configuration for the remote observer client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Base URL of the observer sockets. `/observers/{game_id}` is appended.
    #[serde(default = "default_ws_base_url")]
    pub ws_base_url: String,

    /// Base URL of the REST API used to seed matches.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Consecutive failed attempts before a game is given up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit. The delay before attempt `n + 1` is `n` units.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Player to subscribe as. Nothing is watched without one.
    #[serde(default)]
    pub user_id: Option<UserId>,

    /// Games to watch on startup.
    #[serde(default)]
    pub games: Vec<GameId>,
}

impl ObserverConfig {
    /// Socket URL for one game.
    pub fn observer_url(&self, game_id: GameId) -> String {
        format!(
            "{}/observers/{game_id}",
            self.ws_base_url.trim_end_matches('/')
        )
    }

    /// Override fields from environment variables.
    ///
    /// - `RANDO_WS_BASE_URL` -> `ws_base_url`
    /// - `RANDO_API_BASE_URL` -> `api_base_url`
    /// - `RANDO_USER_ID` -> `user_id`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RANDO_WS_BASE_URL") {
            self.ws_base_url = val;
        }
        if let Ok(val) = std::env::var("RANDO_API_BASE_URL") {
            self.api_base_url = val;
        }
        if let Ok(val) = std::env::var("RANDO_USER_ID") {
            self.user_id = Some(UserId::new(val));
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            ws_base_url: default_ws_base_url(),
            api_base_url: default_api_base_url(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_id: None,
            games: Vec::new(),
        }
    }
}

fn default_ws_base_url() -> String {
    "wss://wotw.orirando.com/api".to_owned()
}

fn default_api_base_url() -> String {
    "https://wotw.orirando.com/api".to_owned()
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_retry_delay_ms() -> u64 {
    1000
}
