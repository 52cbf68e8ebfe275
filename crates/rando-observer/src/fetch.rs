//! REST seeding of match state.
//!
//! The observer socket only pushes changes. A freshly watched match is
//! seeded from `GET {api}/games/{id}` and, when the game has a board,
//! `GET {api}/bingo/{id}`.

use rando_types::{BingoBoard, BingoTeam, GameId, Team};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::ObserverError;

/// Body of `GET /games/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameResponse {
    #[serde(default)]
    teams: Vec<Team>,
    #[serde(default)]
    has_bingo_board: bool,
}

/// Body of `GET /bingo/{id}`.
#[derive(Debug, Deserialize)]
struct BingoResponse {
    board: Option<BingoBoard>,
    #[serde(default)]
    teams: Vec<BingoTeam>,
}

/// Bingo part of a fetched match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedBingo {
    /// The board. `None` when the server has none.
    pub board: Option<BingoBoard>,
    /// Bingo standings.
    pub teams: Vec<BingoTeam>,
}

/// A match as returned by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedMatch {
    /// Teams in the match.
    pub teams: Vec<Team>,
    /// Bingo state. `None` when the game has no board, in which case the
    /// projected board is left as is.
    pub bingo: Option<FetchedBingo>,
}

/// HTTP client for the match REST API.
#[derive(Debug, Clone)]
pub struct MatchFetcher {
    client: reqwest::Client,
    api_base_url: String,
}

impl MatchFetcher {
    /// Create a fetcher against `api_base_url`.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Fetch teams and, if present, the bingo board of a game.
    ///
    /// # Errors
    ///
    /// [`ObserverError::Http`] if the game itself cannot be fetched. Bingo
    /// failures never fail the call.
    pub async fn fetch_match(&self, game_id: GameId) -> Result<FetchedMatch, ObserverError> {
        let url = format!("{}/games/{game_id}", self.api_base_url);
        let game: GameResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let bingo = if game.has_bingo_board {
            Some(self.fetch_bingo(game_id).await)
        } else {
            None
        };

        Ok(FetchedMatch {
            teams: game.teams,
            bingo,
        })
    }

    /// Fetch the bingo board of a game.
    ///
    /// A 404 means the game has no board. Any other failure is logged and
    /// treated the same way.
    pub async fn fetch_bingo(&self, game_id: GameId) -> FetchedBingo {
        match self.try_fetch_bingo(game_id).await {
            Ok(bingo) => bingo,
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                info!(%game_id, "No bingo board available");
                FetchedBingo::default()
            }
            Err(e) => {
                error!(%game_id, error = %e, "Failed to fetch bingo board");
                FetchedBingo::default()
            }
        }
    }

    async fn try_fetch_bingo(&self, game_id: GameId) -> Result<FetchedBingo, reqwest::Error> {
        let url = format!("{}/bingo/{game_id}", self.api_base_url);
        let response: BingoResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(FetchedBingo {
            board: response.board,
            teams: response.teams,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_response_defaults_missing_fields() {
        let parsed: Result<GameResponse, _> = serde_json::from_str("{}");
        let game = parsed.ok();
        assert!(game.as_ref().is_some_and(|g| g.teams.is_empty()));
        assert!(game.is_some_and(|g| !g.has_bingo_board));
    }

    #[test]
    fn bingo_response_tolerates_missing_teams() {
        let parsed: Result<BingoResponse, _> =
            serde_json::from_str(r#"{"board":{"size":5,"squares":[]}}"#);
        let bingo = parsed.ok();
        assert_eq!(bingo.as_ref().and_then(|b| b.board.as_ref()).map(|b| b.size), Some(5));
        assert!(bingo.is_some_and(|b| b.teams.is_empty()));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let fetcher = MatchFetcher::new("http://localhost:1/api/");
        assert_eq!(fetcher.api_base_url, "http://localhost:1/api");
    }
}
