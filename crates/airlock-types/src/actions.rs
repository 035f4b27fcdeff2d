//! Decisions returned by the oracle and the outcomes resolution assigns them.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DegradedReason, RejectionReason};
use crate::ids::{AgentId, RoomId};

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// One agent's choice for a movement sub-step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MovementAction {
    /// Walk to an adjacent room.
    Move {
        /// Destination room; must neighbor the current room.
        to: RoomId,
    },
    /// Remain in the current room. The safe default.
    Stay,
    /// Report a body lying in the current room, opening a meeting.
    Report {
        /// The deceased agent whose body is reported.
        body: AgentId,
    },
    /// Press the once-per-game meeting button.
    PressButton,
    /// Eliminate a co-located honest agent (Byzantine only).
    Eliminate {
        /// The agent to eliminate.
        target: AgentId,
    },
}

impl MovementAction {
    /// Short keyword for logs and persistence.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Stay => "stay",
            Self::Report { .. } => "report",
            Self::PressButton => "button",
            Self::Eliminate { .. } => "eliminate",
        }
    }

    /// Returns `true` for actions that open a meeting.
    pub const fn is_trigger(&self) -> bool {
        matches!(self, Self::Report { .. } | Self::PressButton)
    }
}

impl fmt::Display for MovementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move { to } => write!(f, "move {to}"),
            Self::Stay => f.write_str("stay"),
            Self::Report { body } => write!(f, "report {body}"),
            Self::PressButton => f.write_str("button"),
            Self::Eliminate { target } => write!(f, "eliminate {target}"),
        }
    }
}

/// What resolution did with a gathered movement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ActionOutcome {
    /// The action took effect.
    Applied,
    /// The action was illegal and resolved as a stay.
    Rejected {
        /// Which rule the action broke.
        reason: RejectionReason,
    },
    /// The oracle gave no usable answer; the agent stayed.
    Degraded {
        /// What went wrong with the decision.
        reason: DegradedReason,
    },
    /// A valid trigger lost to an earlier agent's trigger this sub-step.
    Superseded,
    /// The action was valid but a meeting (or the actor's own elimination)
    /// ended the sub-step first.
    Preempted,
}

impl ActionOutcome {
    /// Returns `true` if the action took effect as chosen.
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Rejected { reason } => write!(f, "rejected ({reason})"),
            Self::Degraded { reason } => write!(f, "degraded ({reason})"),
            Self::Superseded => f.write_str("superseded"),
            Self::Preempted => f.write_str("preempted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Meetings
// ---------------------------------------------------------------------------

/// One statement made during discussion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Utterance {
    /// What the agent said.
    pub text: String,
}

impl Utterance {
    /// Create an utterance from text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The empty utterance used as the discussion default.
    pub const fn empty() -> Self {
        Self {
            text: String::new(),
        }
    }

    /// Returns `true` if nothing was said.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One agent's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Ballot {
    /// A vote to eject the named candidate.
    Candidate(AgentId),
    /// Abstain. Never counts toward any candidate.
    Skip,
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate(id) => write!(f, "{id}"),
            Self::Skip => f.write_str("SKIP"),
        }
    }
}

/// A body left in a room by an elimination. Carries no eliminator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Body {
    /// Where the body lies.
    pub room: RoomId,
    /// Who was eliminated.
    pub deceased: AgentId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_report_and_button_trigger() {
        assert!(MovementAction::PressButton.is_trigger());
        assert!(MovementAction::Report { body: AgentId::new(5) }.is_trigger());
        assert!(!MovementAction::Stay.is_trigger());
        assert!(
            !MovementAction::Eliminate {
                target: AgentId::new(5)
            }
            .is_trigger()
        );
    }

    #[test]
    fn whitespace_utterance_is_empty() {
        assert!(Utterance::new("  \n").is_empty());
        assert!(!Utterance::new("I was in MedBay").is_empty());
    }

    #[test]
    fn ballot_display() {
        assert_eq!(Ballot::Skip.to_string(), "SKIP");
        assert_eq!(Ballot::Candidate(AgentId::new(3)).to_string(), "Agent_3");
    }
}
