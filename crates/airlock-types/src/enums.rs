//! Enumeration types for the Airlock simulation.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Roles and status
// ---------------------------------------------------------------------------

/// The hidden allegiance of an agent. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Crew member trying to find and eject the Byzantine agents.
    Honest,
    /// Saboteur that may eliminate co-located honest agents.
    Byzantine,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Honest => f.write_str("honest"),
            Self::Byzantine => f.write_str("byzantine"),
        }
    }
}

/// Life-cycle status of an agent.
///
/// The only legal transitions are `Active -> Eliminated` and
/// `Active -> Ejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AgentStatus {
    /// Still playing: moves, speaks and votes.
    Active,
    /// Eliminated by a Byzantine agent during movement.
    Eliminated,
    /// Voted out at a meeting.
    Ejected,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Eliminated => f.write_str("eliminated"),
            Self::Ejected => f.write_str("ejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// Phase of the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// Agents move between rooms in sub-steps.
    Movement,
    /// A meeting is open and agents are speaking.
    Discussion,
    /// A meeting is open and agents are voting.
    Voting,
    /// The round is being closed out.
    RoundEnd,
    /// Terminal: the outcome is decided.
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Movement => "movement",
            Self::Discussion => "discussion",
            Self::Voting => "voting",
            Self::RoundEnd => "round_end",
            Self::GameOver => "game_over",
        };
        f.write_str(name)
    }
}

/// Result of a game from the honest crew's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Outcome {
    /// Neither side has won yet.
    Undecided,
    /// Every Byzantine agent is gone, or the crew outlasted the round limit.
    Win,
    /// Byzantine agents equal or outnumber honest agents.
    Lose,
}

impl Outcome {
    /// Returns `true` once the game is decided.
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Undecided)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undecided => f.write_str("undecided"),
            Self::Win => f.write_str("win"),
            Self::Lose => f.write_str("lose"),
        }
    }
}

/// What opened a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MeetingCause {
    /// An agent reported a body in its room.
    BodyReport,
    /// An agent pressed the once-per-game button in the meeting room.
    EmergencyButton,
}

impl fmt::Display for MeetingCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BodyReport => f.write_str("body_report"),
            Self::EmergencyButton => f.write_str("emergency_button"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision quality
// ---------------------------------------------------------------------------

/// Why a decision was replaced by the safe default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DegradedReason {
    /// The oracle did not answer before the per-call deadline.
    Timeout,
    /// The oracle returned an error or its task panicked.
    OracleFailure,
    /// The oracle answered with text that maps to no action.
    Unparseable,
    /// The oracle answered with an action that is not legal here.
    Illegal,
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::OracleFailure => "oracle_failure",
            Self::Unparseable => "unparseable",
            Self::Illegal => "illegal",
        };
        f.write_str(name)
    }
}

/// Why a movement-phase action was rejected during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RejectionReason {
    /// The acting agent is no longer active.
    ActorInactive,
    /// The destination is not a neighbor of the current room.
    NotAdjacent,
    /// No body of the named agent lies in the reporter's room.
    NoBodyPresent,
    /// The button can only be pressed in the meeting room.
    NotInMeetingRoom,
    /// The once-per-game button has already been pressed.
    ButtonAlreadyUsed,
    /// Only Byzantine agents may eliminate.
    NotByzantine,
    /// The eliminator is still on cooldown.
    OnCooldown,
    /// The target is not in the eliminator's room.
    TargetNotPresent,
    /// The target is no longer active.
    TargetNotActive,
    /// Byzantine agents cannot eliminate each other.
    TargetNotHonest,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActorInactive => "actor_inactive",
            Self::NotAdjacent => "not_adjacent",
            Self::NoBodyPresent => "no_body_present",
            Self::NotInMeetingRoom => "not_in_meeting_room",
            Self::ButtonAlreadyUsed => "button_already_used",
            Self::NotByzantine => "not_byzantine",
            Self::OnCooldown => "on_cooldown",
            Self::TargetNotPresent => "target_not_present",
            Self::TargetNotActive => "target_not_active",
            Self::TargetNotHonest => "target_not_honest",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_undecided_is_open() {
        assert!(!Outcome::Undecided.is_decided());
        assert!(Outcome::Win.is_decided());
        assert!(Outcome::Lose.is_decided());
    }

    #[test]
    fn phase_names_are_snake_case() {
        assert_eq!(Phase::RoundEnd.to_string(), "round_end");
        assert_eq!(Phase::GameOver.to_string(), "game_over");
    }
}
