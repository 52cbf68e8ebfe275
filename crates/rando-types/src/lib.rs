//! Shared type definitions for the randomizer state sync services.
//!
//! Both the local tracker hub and the remote observer client speak in
//! terms of the types defined here.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (`StateId`, `GameId`, `TeamId`, `UserId`)
//! - [`structs`] -- Tracker updates and the projected match state

pub mod ids;
pub mod structs;

pub use ids::{GameId, StateId, TeamId, UserId};
pub use structs::{
    BingoBoard, BingoGoal, BingoSquare, BingoTeam, Match, Team, TrackerUpdate, UserInfo,
};
