//! Projected match state, one [`Match`] per watched game.
//!
//! Every mutation goes through a reducer that replaces exactly one field
//! of one match. Reducers are total: the match is created on first
//! reference, so any packet for any game yields a valid next state.

use std::collections::HashMap;

use rando_proto::ObserverPacket;
use rando_types::{BingoBoard, BingoTeam, GameId, Match, Team};
use tracing::debug;

/// All matches known to the client.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    matches: HashMap<GameId, Match>,
}

impl MatchTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The match for `game_id`, created empty if unknown.
    pub fn ensure(&mut self, game_id: GameId) -> &mut Match {
        self.matches.entry(game_id).or_default()
    }

    /// Replace the bingo board.
    pub fn set_board(&mut self, game_id: GameId, board: Option<BingoBoard>) {
        self.ensure(game_id).bingo_board = board;
    }

    /// Replace the team list.
    pub fn set_teams(&mut self, game_id: GameId, teams: Vec<Team>) {
        self.ensure(game_id).teams = teams;
    }

    /// Replace the bingo standings.
    pub fn set_bingo_teams(&mut self, game_id: GameId, bingo_teams: Vec<BingoTeam>) {
        self.ensure(game_id).bingo_teams = bingo_teams;
    }

    /// Apply an inbound packet. Returns whether the match changed.
    pub fn apply(&mut self, game_id: GameId, packet: ObserverPacket) -> bool {
        match packet {
            ObserverPacket::SyncBoard { board } => self.set_board(game_id, Some(board)),
            ObserverPacket::GameInfo { teams } => self.set_teams(game_id, teams),
            ObserverPacket::SyncBingoTeams { teams } => self.set_bingo_teams(game_id, teams),
            ObserverPacket::RequestUpdates { .. } => {
                debug!(%game_id, "Ignoring echoed subscribe request");
                return false;
            }
            ObserverPacket::Unknown { kind } => {
                debug!(%game_id, kind, "Ignoring unknown observer packet");
                return false;
            }
        }
        true
    }

    /// The match for `game_id`, if any packet or fetch has touched it.
    pub fn get(&self, game_id: GameId) -> Option<&Match> {
        self.matches.get(&game_id)
    }

    /// Forget a match.
    pub fn remove(&mut self, game_id: GameId) -> Option<Match> {
        self.matches.remove(&game_id)
    }

    /// Ids of every known match.
    pub fn game_ids(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.matches.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of known matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether no match is known.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
