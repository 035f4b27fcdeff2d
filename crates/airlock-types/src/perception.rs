//! Read-only views handed to the decision oracle.
//!
//! A view is the **only** information an agent receives. Occupancy is
//! visible for the agent's own room only; neighboring rooms appear as names.
//! Nothing here ever names who eliminated whom.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::actions::Body;
use crate::enums::{MeetingCause, Role};
use crate::ids::{AgentId, GameId, MeetingId, RoomId};

/// The agent's own state as presented to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SelfState {
    /// The agent's identifier.
    pub id: AgentId,
    /// The agent's own role.
    pub role: Role,
    /// Display tag (a color marker).
    pub display_tag: String,
    /// The room the agent is in.
    pub room: RoomId,
    /// Assigned task room, for honest agents.
    pub task_room: Option<RoomId>,
    /// Whether the task has been completed.
    pub task_done: bool,
    /// Fellow Byzantine agents. Empty for honest agents.
    pub teammates: Vec<AgentId>,
}

/// Everything an agent perceives at the start of a movement sub-step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldView {
    /// Game the view belongs to.
    pub game_id: GameId,
    /// Current round (1-based).
    pub round: u32,
    /// Current sub-step within the round (0-based).
    pub sub_step: u32,
    /// Movement sub-steps per round.
    pub max_sub_steps: u32,
    /// The agent's own state.
    pub self_state: SelfState,
    /// Other active agents in the same room, in canonical order.
    pub occupants: Vec<AgentId>,
    /// Bodies lying in the same room.
    pub bodies: Vec<AgentId>,
    /// Names of adjacent rooms.
    pub exits: Vec<RoomId>,
    /// The room holding the meeting button.
    pub meeting_room: RoomId,
    /// Whether pressing the button here would be legal.
    pub button_available: bool,
    /// Occupants this agent may eliminate right now. Empty unless the agent
    /// is Byzantine and off cooldown.
    pub eliminable: Vec<AgentId>,
    /// Number of agents still active.
    pub active_count: u32,
}

/// One line of the meeting transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TranscriptEntry {
    /// Speaker.
    pub speaker: AgentId,
    /// Discussion turn (0-based).
    pub turn: u32,
    /// What was said; empty when the speaker's decision degraded.
    pub text: String,
    /// `true` if the oracle failed and the empty default was used.
    pub degraded: bool,
}

/// Context handed to the oracle for discussion and voting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MeetingContext {
    /// Game the meeting belongs to.
    pub game_id: GameId,
    /// Meeting identifier.
    pub meeting_id: MeetingId,
    /// Round the meeting was called in.
    pub round: u32,
    /// What opened the meeting.
    pub cause: MeetingCause,
    /// Who reported or pressed the button.
    pub caller: AgentId,
    /// Bodies discovered when the meeting opened.
    pub bodies: Vec<Body>,
    /// The turn being requested (equal to `total_turns` while voting).
    pub turn: u32,
    /// Number of discussion turns in this meeting.
    pub total_turns: u32,
    /// All completed turns, in canonical order within each turn.
    pub transcript: Vec<TranscriptEntry>,
    /// Agents that may be voted for (every active agent at open).
    pub candidates: Vec<AgentId>,
    /// The asking agent's own state.
    pub self_state: SelfState,
}
