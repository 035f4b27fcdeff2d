//! Identifier types.
//!
//! Games and meetings are identified by UUID v7 (time-ordered) so rows in the
//! log tables sort by creation. Agents carry a small 1-based index instead:
//! the numeric order of [`AgentId`] is the canonical agent-index order every
//! resolution step iterates in. Rooms are identified by name.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]

        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one game instance.
    GameId
}

define_id! {
    /// Unique identifier for one meeting within a game.
    MeetingId
}

/// Prefix used when rendering an [`AgentId`] for prompts, logs and the
/// observer feed.
pub const AGENT_NAME_PREFIX: &str = "Agent_";

/// Identifier of an agent within one game.
///
/// Wraps the agent's 1-based seat index. Ordering follows the index, which
/// makes `BTreeMap<AgentId, _>` iterate in canonical order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct AgentId(pub u32);

impl AgentId {
    /// Create an identifier for the given 1-based seat index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the seat index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{AGENT_NAME_PREFIX}{}", self.0)
    }
}

/// Error returned when a string is not of the form `Agent_<n>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAgentIdError(pub String);

impl fmt::Display for ParseAgentIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not an agent name: {}", self.0)
    }
}

impl std::error::Error for ParseAgentIdError {}

impl FromStr for AgentId {
    type Err = ParseAgentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .strip_prefix(AGENT_NAME_PREFIX)
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|index| *index > 0)
            .map(Self)
            .ok_or_else(|| ParseAgentIdError(trimmed.to_owned()))
    }
}

/// Identifier of a room: its name on the map.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct RoomId(pub String);

impl RoomId {
    /// Create a room identifier from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the room name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn game_ids_are_unique() {
        let a = GameId::new();
        let b = GameId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn agent_id_displays_as_agent_name() {
        assert_eq!(AgentId::new(3).to_string(), "Agent_3");
    }

    #[test]
    fn agent_id_parses_from_name() {
        assert_eq!("Agent_7".parse::<AgentId>(), Ok(AgentId::new(7)));
        assert_eq!(" Agent_12 ".parse::<AgentId>(), Ok(AgentId::new(12)));
        assert!("Agent_0".parse::<AgentId>().is_err());
        assert!("agent_3".parse::<AgentId>().is_err());
        assert!("SKIP".parse::<AgentId>().is_err());
    }

    #[test]
    fn agent_ids_order_by_index() {
        let mut ids = vec![AgentId::new(10), AgentId::new(2), AgentId::new(5)];
        ids.sort();
        assert_eq!(ids, vec![AgentId::new(2), AgentId::new(5), AgentId::new(10)]);
    }

    #[test]
    fn agent_id_serializes_as_number() {
        let json = serde_json::to_string(&AgentId::new(4)).unwrap();
        assert_eq!(json, "4");
    }
}
