//! Structured, round-indexed log records.
//!
//! These replace free-text log files: the sink stores them and the decision
//! runner queries them back by round range to build an agent's memory.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::actions::{ActionOutcome, Body, MovementAction};
use crate::enums::{MeetingCause, Outcome, Role};
use crate::ids::{AgentId, GameId, MeetingId, RoomId};

/// One movement decision and what resolution did with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionEntry {
    /// Game.
    pub game_id: GameId,
    /// Round (1-based).
    pub round: u32,
    /// Sub-step within the round.
    pub sub_step: u32,
    /// Acting agent.
    pub agent_id: AgentId,
    /// Room the agent started the sub-step in.
    pub from_room: RoomId,
    /// Room the agent ended the sub-step in.
    pub to_room: RoomId,
    /// The action as decided (the safe default when degraded).
    pub action: MovementAction,
    /// What resolution did with it.
    pub outcome: ActionOutcome,
    /// Other active agents the agent saw at the end of the sub-step.
    pub witnessed: Vec<AgentId>,
    /// Bodies the agent saw at the end of the sub-step.
    pub bodies_seen: Vec<AgentId>,
}

/// One utterance made during discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DiscussionEntry {
    /// Game.
    pub game_id: GameId,
    /// Meeting.
    pub meeting_id: MeetingId,
    /// Round.
    pub round: u32,
    /// Speaker.
    pub agent_id: AgentId,
    /// Discussion turn (0-based).
    pub turn: u32,
    /// Utterance text.
    pub text: String,
    /// `true` if the empty default was used.
    pub degraded: bool,
}

/// Summary of a resolved meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResultsEntry {
    /// Game.
    pub game_id: GameId,
    /// Meeting.
    pub meeting_id: MeetingId,
    /// Round.
    pub round: u32,
    /// What opened the meeting.
    pub cause: MeetingCause,
    /// Who called it.
    pub caller: AgentId,
    /// Bodies discovered at open.
    pub bodies: Vec<Body>,
    /// Votes per candidate, in canonical order. Only candidates with votes.
    pub tally: Vec<VoteCount>,
    /// Number of SKIP ballots.
    pub skips: u32,
    /// Ejected agent, if any.
    pub ejected: Option<AgentId>,
    /// Active agents remaining after the meeting.
    pub remaining_active: u32,
}

/// Votes received by one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VoteCount {
    /// The candidate.
    pub candidate: AgentId,
    /// Votes received.
    pub votes: u32,
}

/// Static metadata for an agent, recorded once at game start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentMetadata {
    /// Game.
    pub game_id: GameId,
    /// Agent.
    pub agent_id: AgentId,
    /// Fixed role.
    pub role: Role,
    /// Decision source tag (model name).
    pub model_tag: String,
    /// Display tag.
    pub display_tag: String,
}

/// Alive/dead counts at the end of a round (round 0 is setup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoundCounts {
    /// Game.
    pub game_id: GameId,
    /// Round.
    pub round: u32,
    /// Active agents.
    pub alive: u32,
    /// Eliminated or ejected agents.
    pub dead: u32,
}

/// Cumulative per-agent statistics for one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentStats {
    /// Votes received across all meetings.
    pub votes_received: u32,
    /// Votes cast for a Byzantine agent (honest voters) or for an honest
    /// agent (Byzantine voters).
    pub correct_votes: u32,
    /// Votes cast for an agent of the opposite kind to the above.
    pub incorrect_votes: u32,
    /// SKIP ballots cast, degraded ones included.
    pub skipped_votes: u32,
    /// Meetings opened with the button.
    pub emergency_meetings: u32,
    /// Meetings opened by reporting a body.
    pub bodies_reported: u32,
    /// Rounds ended while active.
    pub rounds_survived: u32,
    /// Eliminations performed.
    pub eliminations: u32,
    /// Times this agent was eliminated (0 or 1).
    pub times_eliminated: u32,
    /// Times this agent was ejected (0 or 1).
    pub ejections: u32,
    /// Moves to another room that took effect.
    pub moves: u32,
    /// Decisions replaced by the safe default.
    pub degraded_decisions: u32,
}

/// Final statistics for one agent, recorded at game end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FinalStats {
    /// Game.
    pub game_id: GameId,
    /// Agent.
    pub agent_id: AgentId,
    /// Fixed role.
    pub role: Role,
    /// Whether the agent's side won.
    pub won: bool,
    /// Game outcome from the crew's perspective.
    pub outcome: Outcome,
    /// Cumulative counters.
    pub stats: AgentStats,
}

/// Every record the core hands to a log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum LogRecord {
    /// Agent metadata at game start.
    Agent(AgentMetadata),
    /// A resolved movement decision.
    Action(ActionEntry),
    /// A discussion utterance.
    Discussion(DiscussionEntry),
    /// A resolved meeting.
    Results(ResultsEntry),
    /// Alive/dead counts.
    Round(RoundCounts),
    /// Final per-agent statistics.
    Final(FinalStats),
}

impl LogRecord {
    /// The round this record belongs to, if it is round-scoped.
    pub const fn round(&self) -> Option<u32> {
        match self {
            Self::Action(e) => Some(e.round),
            Self::Discussion(e) => Some(e.round),
            Self::Results(e) => Some(e.round),
            Self::Round(e) => Some(e.round),
            Self::Agent(_) | Self::Final(_) => None,
        }
    }

    /// The game this record belongs to.
    pub const fn game_id(&self) -> GameId {
        match self {
            Self::Agent(e) => e.game_id,
            Self::Action(e) => e.game_id,
            Self::Discussion(e) => e.game_id,
            Self::Results(e) => e.game_id,
            Self::Round(e) => e.game_id,
            Self::Final(e) => e.game_id,
        }
    }
}
