//! Authoritative state of one game.
//!
//! [`GameState`] is owned by the scheduler. Oracle tasks only ever see the
//! snapshots built from it in [`crate::perception`].

use airlock_agents::AgentStore;
use airlock_types::{AgentId, AgentStatus, Body, GameId, Outcome, Phase};

use crate::meeting::MeetingState;

/// A broken structural invariant. Always a programming error; the game that
/// observes one is aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Status counts no longer add up to the roster size.
    #[error("agent count mismatch: {active} active + {eliminated} eliminated + {ejected} ejected != {total}")]
    AgentCount {
        /// Active agents.
        active: usize,
        /// Eliminated agents.
        eliminated: usize,
        /// Ejected agents.
        ejected: usize,
        /// Roster size at setup.
        total: usize,
    },

    /// A meeting is open outside the discussion and voting phases, or
    /// missing inside them.
    #[error("meeting state does not match phase {phase}")]
    MeetingPhase {
        /// The phase at the time of the check.
        phase: Phase,
    },

    /// A body marker names an agent that is not eliminated.
    #[error("body marker for {0}, who is not eliminated")]
    PhantomBody(AgentId),

    /// The outcome is decided but the phase is not terminal, or the reverse.
    #[error("outcome {outcome} does not match phase {phase}")]
    OutcomePhase {
        /// The outcome.
        outcome: Outcome,
        /// The phase.
        phase: Phase,
    },

    /// A phase change the state machine does not allow.
    #[error("illegal transition {from} -> {to}")]
    Transition {
        /// Current phase.
        from: Phase,
        /// Requested phase.
        to: Phase,
    },
}

/// The full state of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Game identifier.
    pub game_id: GameId,
    /// Current round; 0 before the first movement phase.
    pub round: u32,
    /// Current phase.
    phase: Phase,
    /// Movement sub-step within the round.
    pub sub_step: u32,
    /// Sub-steps resolved since the game started.
    pub global_step: u64,
    /// Every agent record.
    pub agents: AgentStore,
    /// Bodies not yet discovered by a meeting.
    pub bodies: Vec<Body>,
    /// Current outcome.
    pub outcome: Outcome,
    /// The open meeting, if any.
    pub meeting: Option<MeetingState>,
    /// Roster size at setup.
    total_agents: usize,
}

impl GameState {
    /// Create the setup state (round 0) for a seated roster.
    pub fn new(game_id: GameId, agents: AgentStore) -> Self {
        let total_agents = agents.len();
        Self {
            game_id,
            round: 0,
            phase: Phase::Movement,
            sub_step: 0,
            global_step: 0,
            agents,
            bodies: Vec::new(),
            outcome: Outcome::Undecided,
            meeting: None,
            total_agents,
        }
    }

    /// The current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Roster size at setup.
    pub const fn total_agents(&self) -> usize {
        self.total_agents
    }

    /// Move to `next`, enforcing the phase state machine.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::Transition`] for any edge the state
    /// machine does not have.
    pub fn transition(&mut self, next: Phase) -> Result<(), InvariantViolation> {
        let allowed = matches!(
            (self.phase, next),
            (Phase::Movement, Phase::Movement | Phase::Discussion | Phase::RoundEnd)
                | (Phase::Discussion, Phase::Voting)
                | (Phase::Voting, Phase::RoundEnd)
                | (Phase::RoundEnd, Phase::Movement | Phase::GameOver)
        );
        if !allowed {
            return Err(InvariantViolation::Transition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Active and dead (eliminated or ejected) counts.
    pub fn alive_dead(&self) -> (usize, usize) {
        let alive = self.agents.count_status(AgentStatus::Active);
        (alive, self.total_agents.saturating_sub(alive))
    }

    /// Check every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let active = self.agents.count_status(AgentStatus::Active);
        let eliminated = self.agents.count_status(AgentStatus::Eliminated);
        let ejected = self.agents.count_status(AgentStatus::Ejected);
        let sum = active.saturating_add(eliminated).saturating_add(ejected);
        if sum != self.total_agents || self.agents.len() != self.total_agents {
            return Err(InvariantViolation::AgentCount {
                active,
                eliminated,
                ejected,
                total: self.total_agents,
            });
        }

        let in_meeting = matches!(self.phase, Phase::Discussion | Phase::Voting);
        if in_meeting != self.meeting.is_some() {
            return Err(InvariantViolation::MeetingPhase { phase: self.phase });
        }

        if let Some(body) = self.bodies.iter().find(|b| {
            self.agents
                .get(b.deceased)
                .is_none_or(|r| r.status() != AgentStatus::Eliminated)
        }) {
            return Err(InvariantViolation::PhantomBody(body.deceased));
        }

        if self.outcome.is_decided() != (self.phase == Phase::GameOver) {
            return Err(InvariantViolation::OutcomePhase {
                outcome: self.outcome,
                phase: self.phase,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_agents::AgentRecord;
    use airlock_types::{Role, RoomId};

    use super::*;

    fn state() -> GameState {
        let agents = AgentStore::from_records((1..=4).map(|i| {
            let role = if i == 1 { Role::Byzantine } else { Role::Honest };
            AgentRecord::new(AgentId::new(i), role, "m", "t", RoomId::from("A"), None)
        }))
        .unwrap();
        GameState::new(GameId::new(), agents)
    }

    #[test]
    fn fresh_state_holds_invariants() {
        let s = state();
        assert!(s.check_invariants().is_ok());
        assert_eq!(s.alive_dead(), (4, 0));
    }

    #[test]
    fn phantom_body_is_detected() {
        let mut s = state();
        s.bodies.push(Body { room: RoomId::from("A"), deceased: AgentId::new(2) });
        assert_eq!(
            s.check_invariants(),
            Err(InvariantViolation::PhantomBody(AgentId::new(2)))
        );
    }

    #[test]
    fn state_machine_rejects_shortcuts() {
        let mut s = state();
        assert!(s.transition(Phase::Voting).is_err());
        assert!(s.transition(Phase::GameOver).is_err());
        assert!(s.transition(Phase::Movement).is_ok());
        assert!(s.transition(Phase::RoundEnd).is_ok());
        assert!(s.transition(Phase::Discussion).is_err());
        assert!(s.transition(Phase::GameOver).is_ok());
        assert!(s.transition(Phase::Movement).is_err());
    }

    #[test]
    fn decided_outcome_outside_game_over_is_a_violation() {
        let mut s = state();
        s.outcome = Outcome::Win;
        assert!(matches!(
            s.check_invariants(),
            Err(InvariantViolation::OutcomePhase { .. })
        ));
    }
}
