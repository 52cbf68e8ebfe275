//! Packets exchanged with the remote match server on an observer socket.

use rando_types::{BingoBoard, BingoTeam, Team, UserId};

use crate::codec::{Packet, body_from_slice, body_to_vec};
use crate::error::CodecError;

/// Kind byte of [`ObserverPacket::RequestUpdates`].
pub const KIND_REQUEST_UPDATES: u8 = 10;
/// Kind byte of [`ObserverPacket::GameInfo`].
pub const KIND_GAME_INFO: u8 = 20;
/// Kind byte of [`ObserverPacket::SyncBoard`].
pub const KIND_SYNC_BOARD: u8 = 21;
/// Kind byte of [`ObserverPacket::SyncBingoTeams`].
pub const KIND_SYNC_BINGO_TEAMS: u8 = 22;

/// A packet on an observer socket.
///
/// `RequestUpdates` is the only outbound kind; everything else is sent by
/// the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverPacket {
    /// Subscribe to match updates on behalf of a player.
    RequestUpdates {
        /// The subscribing player.
        player_id: UserId,
    },
    /// Current team list of the match.
    GameInfo {
        /// All teams.
        teams: Vec<Team>,
    },
    /// Full bingo board.
    SyncBoard {
        /// The board.
        board: BingoBoard,
    },
    /// Current bingo standings.
    SyncBingoTeams {
        /// Standings per team.
        teams: Vec<BingoTeam>,
    },
    /// A kind this build does not know. Decode-only.
    Unknown {
        /// The unrecognised kind byte.
        kind: u8,
    },
}

impl Packet for ObserverPacket {
    fn kind(&self) -> u8 {
        match self {
            Self::RequestUpdates { .. } => KIND_REQUEST_UPDATES,
            Self::GameInfo { .. } => KIND_GAME_INFO,
            Self::SyncBoard { .. } => KIND_SYNC_BOARD,
            Self::SyncBingoTeams { .. } => KIND_SYNC_BINGO_TEAMS,
            Self::Unknown { kind } => *kind,
        }
    }

    fn encode_body(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::RequestUpdates { player_id } => body_to_vec(player_id),
            Self::GameInfo { teams } => body_to_vec(teams),
            Self::SyncBoard { board } => body_to_vec(board),
            Self::SyncBingoTeams { teams } => body_to_vec(teams),
            Self::Unknown { kind } => Err(CodecError::Unencodable(*kind)),
        }
    }

    fn decode_body(kind: u8, body: &[u8]) -> Result<Self, CodecError> {
        match kind {
            KIND_REQUEST_UPDATES => Ok(Self::RequestUpdates {
                player_id: body_from_slice(body)?,
            }),
            KIND_GAME_INFO => Ok(Self::GameInfo {
                teams: body_from_slice(body)?,
            }),
            KIND_SYNC_BOARD => Ok(Self::SyncBoard {
                board: body_from_slice(body)?,
            }),
            KIND_SYNC_BINGO_TEAMS => Ok(Self::SyncBingoTeams {
                teams: body_from_slice(body)?,
            }),
            other => Ok(Self::Unknown { kind: other }),
        }
    }
}
