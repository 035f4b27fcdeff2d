//! Read-only projection of a game for external observers.
//!
//! Produced after every phase change. The core never reads it back, and
//! nothing in it names an eliminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentStatus, Outcome, Phase, Role};
use crate::ids::{AgentId, GameId, RoomId};

/// Kind of a feed entry, for colouring in a front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FeedKind {
    /// Round or phase boundary.
    Phase,
    /// A body appeared.
    Elimination,
    /// A meeting opened.
    Meeting,
    /// A meeting resolved.
    Vote,
    /// The game ended.
    Outcome,
}

/// One line of the recent-event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FeedEntry {
    /// Wall-clock time the entry was produced.
    pub at: DateTime<Utc>,
    /// Round the event belongs to.
    pub round: u32,
    /// Entry kind.
    pub kind: FeedKind,
    /// Human-readable message.
    pub message: String,
}

/// Occupants and bodies of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoomSnapshot {
    /// Room.
    pub room: RoomId,
    /// Active agents in the room.
    pub occupants: Vec<AgentId>,
    /// Bodies lying in the room.
    pub bodies: Vec<AgentId>,
}

/// Public state of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Agent.
    pub id: AgentId,
    /// Display tag.
    pub display_tag: String,
    /// Model tag.
    pub model_tag: String,
    /// Role (observers see everything agents cannot).
    pub role: Role,
    /// Status.
    pub status: AgentStatus,
    /// Current room.
    pub room: RoomId,
    /// Votes received in the latest meeting.
    pub votes_received: u32,
}

/// The full observer projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ObserverSnapshot {
    /// Game.
    pub game_id: GameId,
    /// Round (0 during setup).
    pub round: u32,
    /// Sub-step within the round.
    pub sub_step: u32,
    /// Current phase.
    pub phase: Phase,
    /// Current outcome.
    pub outcome: Outcome,
    /// Every room, in name order.
    pub rooms: Vec<RoomSnapshot>,
    /// Every agent, in canonical order.
    pub agents: Vec<AgentSnapshot>,
    /// Most recent events, oldest first.
    pub feed: Vec<FeedEntry>,
}
