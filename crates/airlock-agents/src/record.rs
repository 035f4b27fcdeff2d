//! Per-agent mutable record.
//!
//! The role is fixed at construction and exposed read-only. Status moves
//! only through [`AgentRecord::eliminate`] and [`AgentRecord::eject`], both
//! of which refuse to leave anything but `Active`.

use airlock_types::{AgentId, AgentStats, AgentStatus, Ballot, Role, RoomId, SelfState};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// The full state of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Identifier; also the canonical order.
    pub id: AgentId,
    /// Hidden allegiance.
    role: Role,
    /// Decision source tag (model name).
    pub model_tag: String,
    /// Display tag.
    pub display_tag: String,
    /// Current room.
    pub room: RoomId,
    /// Life-cycle status.
    status: AgentStatus,
    /// Set on every record once anyone presses the button.
    pub button_used: bool,
    /// Assigned task room (honest agents only).
    pub task_room: Option<RoomId>,
    /// Whether the task has been finished.
    pub task_done: bool,
    /// Votes received in the current or latest meeting.
    pub votes_received: u32,
    /// Ballot cast in the current or latest meeting.
    pub vote_cast: Option<Ballot>,
    /// First global sub-step at which this agent may eliminate again.
    pub kill_ready_at: u64,
    /// Cumulative statistics.
    pub stats: AgentStats,
}

impl AgentRecord {
    /// Create an active agent in `room`.
    pub fn new(
        id: AgentId,
        role: Role,
        model_tag: impl Into<String>,
        display_tag: impl Into<String>,
        room: RoomId,
        task_room: Option<RoomId>,
    ) -> Self {
        Self {
            id,
            role,
            model_tag: model_tag.into(),
            display_tag: display_tag.into(),
            room,
            status: AgentStatus::Active,
            button_used: false,
            task_room,
            task_done: false,
            votes_received: 0,
            vote_cast: None,
            kill_ready_at: 0,
            stats: AgentStats::default(),
        }
    }

    /// The agent's fixed role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The agent's status.
    pub const fn status(&self) -> AgentStatus {
        self.status
    }

    /// Returns `true` while the agent still plays.
    pub const fn is_active(&self) -> bool {
        matches!(self.status, AgentStatus::Active)
    }

    /// Returns `true` for Byzantine agents.
    pub const fn is_byzantine(&self) -> bool {
        matches!(self.role, Role::Byzantine)
    }

    /// Returns `true` if the agent may eliminate at `global_step`.
    pub const fn off_cooldown(&self, global_step: u64) -> bool {
        self.is_byzantine() && self.is_active() && global_step >= self.kill_ready_at
    }

    /// Mark the agent eliminated.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] unless the agent is active.
    pub fn eliminate(&mut self) -> Result<(), AgentError> {
        self.leave_active(AgentStatus::Eliminated)?;
        self.stats.times_eliminated = self.stats.times_eliminated.saturating_add(1);
        Ok(())
    }

    /// Mark the agent ejected.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] unless the agent is active.
    pub fn eject(&mut self) -> Result<(), AgentError> {
        self.leave_active(AgentStatus::Ejected)?;
        self.stats.ejections = self.stats.ejections.saturating_add(1);
        Ok(())
    }

    /// Record an elimination performed by this agent at `global_step` and
    /// start its cooldown.
    pub const fn record_kill(&mut self, global_step: u64, cooldown_sub_steps: u64) {
        self.stats.eliminations = self.stats.eliminations.saturating_add(1);
        self.kill_ready_at = global_step
            .saturating_add(1)
            .saturating_add(cooldown_sub_steps);
    }

    /// The agent-facing view of this record.
    pub fn self_state(&self, teammates: Vec<AgentId>) -> SelfState {
        SelfState {
            id: self.id,
            role: self.role,
            display_tag: self.display_tag.clone(),
            room: self.room.clone(),
            task_room: self.task_room.clone(),
            task_done: self.task_done,
            teammates,
        }
    }

    fn leave_active(&mut self, to: AgentStatus) -> Result<(), AgentError> {
        if !self.is_active() {
            return Err(AgentError::IllegalTransition {
                agent: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: Role) -> AgentRecord {
        AgentRecord::new(
            AgentId::new(1),
            role,
            "gpt-4o",
            "red",
            RoomId::from("Cafeteria"),
            None,
        )
    }

    #[test]
    fn status_leaves_active_once() {
        let mut agent = record(Role::Honest);
        assert!(agent.eliminate().is_ok());
        assert_eq!(agent.status(), AgentStatus::Eliminated);
        assert!(matches!(
            agent.eliminate(),
            Err(AgentError::IllegalTransition { .. })
        ));
        assert!(agent.eject().is_err());
        assert_eq!(agent.status(), AgentStatus::Eliminated);
        assert_eq!(agent.stats.times_eliminated, 1);
        assert_eq!(agent.stats.ejections, 0);
    }

    #[test]
    fn ejected_agent_cannot_be_eliminated() {
        let mut agent = record(Role::Byzantine);
        assert!(agent.eject().is_ok());
        assert!(agent.eliminate().is_err());
        assert_eq!(agent.status(), AgentStatus::Ejected);
    }

    #[test]
    fn cooldown_counts_global_sub_steps() {
        let mut agent = record(Role::Byzantine);
        assert!(agent.off_cooldown(0));
        agent.record_kill(3, 2);
        assert!(!agent.off_cooldown(4));
        assert!(!agent.off_cooldown(5));
        assert!(agent.off_cooldown(6));
        assert_eq!(agent.stats.eliminations, 1);
    }

    #[test]
    fn zero_cooldown_allows_one_kill_per_sub_step() {
        let mut agent = record(Role::Byzantine);
        agent.record_kill(3, 0);
        assert!(!agent.off_cooldown(3));
        assert!(agent.off_cooldown(4));
    }

    #[test]
    fn honest_agents_are_never_off_cooldown() {
        assert!(!record(Role::Honest).off_cooldown(100));
    }
}
