//! Strongly-typed identifiers.
//!
//! Uber states are addressed by a `(group, state)` pair; matches and teams
//! by numeric server ids; users by the opaque string the server hands out.
//! Each gets its own type so they cannot be mixed up at compile time.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a numeric server id.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner numeric value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Identifier of a live multiplayer match on the remote server.
    GameId
}

define_id! {
    /// Identifier of a team inside a match.
    TeamId
}

/// Identifier of the user subscribing to a match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one persistent game flag ("uber state").
///
/// The pair is globally unique per flag and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId {
    /// Uber state group.
    pub group: u32,
    /// State index within the group.
    pub state: u32,
}

impl StateId {
    /// Create a state id from its group and state index.
    pub const fn new(group: u32, state: u32) -> Self {
        Self { group, state }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.state)
    }
}
