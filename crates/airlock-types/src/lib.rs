//! Shared type definitions for the Airlock simulation.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: identifiers, the actions the decision oracle returns, the
//! views it is given, the structured log records, and the observer
//! snapshot. Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Game, meeting, agent and room identifiers
//! - [`enums`] -- Roles, statuses, phases, outcomes and reasons
//! - [`actions`] -- Movement actions, ballots, utterances and bodies
//! - [`perception`] -- World views and meeting contexts for the oracle
//! - [`log`] -- Round-indexed log records and per-agent statistics
//! - [`snapshot`] -- Observer projection of a game

pub mod actions;
pub mod enums;
pub mod ids;
pub mod log;
pub mod perception;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use actions::{ActionOutcome, Ballot, Body, MovementAction, Utterance};
pub use enums::{AgentStatus, DegradedReason, MeetingCause, Outcome, Phase, RejectionReason, Role};
pub use ids::{AGENT_NAME_PREFIX, AgentId, GameId, MeetingId, ParseAgentIdError, RoomId};
pub use log::{
    ActionEntry, AgentMetadata, AgentStats, DiscussionEntry, FinalStats, LogRecord, ResultsEntry,
    RoundCounts, VoteCount,
};
pub use perception::{MeetingContext, SelfState, TranscriptEntry, WorldView};
pub use snapshot::{AgentSnapshot, FeedEntry, FeedKind, ObserverSnapshot, RoomSnapshot};
