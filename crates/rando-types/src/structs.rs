//! Value types shared by the tracker hub and the observer client.
//!
//! Field names serialize in `camelCase` so the same structs can be read
//! straight from the remote server's REST responses.

use serde::{Deserialize, Serialize};

use crate::ids::{TeamId, UserId};

// ---------------------------------------------------------------------------
// Local tracker
// ---------------------------------------------------------------------------

/// A single converted value pushed to tracker clients.
///
/// Derived from a raw uber state change; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerUpdate {
    /// Human-readable tracking id, e.g. `skill_bash`.
    pub tracking_id: String,
    /// Converted value.
    pub value: i64,
}

impl TrackerUpdate {
    /// Create an update for the given tracking id.
    pub fn new(tracking_id: impl Into<String>, value: i64) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Remote match state
// ---------------------------------------------------------------------------

/// A player as reported by the match server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Server-side user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// A team (world) participating in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team id.
    pub id: TeamId,
    /// Members of the team.
    pub members: Vec<UserInfo>,
}

/// One goal inside a bingo square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoGoal {
    /// Goal description.
    pub text: String,
    /// Whether the observing team completed this goal.
    pub completed: bool,
}

/// A square on the bingo board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoSquare {
    /// Column, zero-based.
    pub x: u32,
    /// Row, zero-based.
    pub y: u32,
    /// Square label.
    pub text: String,
    /// Sub-goals that make up the square.
    pub goals: Vec<BingoGoal>,
    /// Teams that completed the square.
    pub completed_by: Vec<TeamId>,
}

/// The shared bingo board of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoBoard {
    /// Edge length of the square board.
    pub size: u32,
    /// All squares of the board.
    pub squares: Vec<BingoSquare>,
}

/// Bingo standing of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoTeam {
    /// Team id.
    pub team_id: TeamId,
    /// Current rank, one-based.
    pub rank: u32,
    /// Completed squares.
    pub squares: u32,
    /// Completed lines.
    pub lines: u32,
    /// Total score.
    pub score: u32,
}

/// Local projection of one remote match.
///
/// Created lazily on first reference and mutated only by packets or REST
/// responses for that match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Teams in the match.
    pub teams: Vec<Team>,
    /// The bingo board, if the match has one.
    pub bingo_board: Option<BingoBoard>,
    /// Bingo standings.
    pub bingo_teams: Vec<BingoTeam>,
}
