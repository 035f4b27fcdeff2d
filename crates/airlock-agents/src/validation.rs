//! Legality rules for movement-phase actions.
//!
//! Each check returns `Ok(())` or the [`RejectionReason`] resolution records
//! before turning the action into a stay. Checks read the state the caller
//! passes in; resolution decides which state that is (the sub-step's start
//! for eliminations, post-elimination for triggers).

use airlock_types::{AgentId, Body, MovementAction, RejectionReason, Role, RoomId};
use airlock_world::RoomGraph;

use crate::record::AgentRecord;
use crate::store::AgentStore;

/// Read-only state needed to judge an action.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The map.
    pub graph: &'a RoomGraph,
    /// All agent records.
    pub agents: &'a AgentStore,
    /// Bodies currently lying on the map.
    pub bodies: &'a [Body],
    /// Global sub-step counter.
    pub global_step: u64,
}

impl ValidationContext<'_> {
    /// Judge `action` for `actor`.
    pub fn check(
        &self,
        actor: &AgentRecord,
        action: &MovementAction,
    ) -> Result<(), RejectionReason> {
        if !actor.is_active() {
            return Err(RejectionReason::ActorInactive);
        }
        match action {
            MovementAction::Stay => Ok(()),
            MovementAction::Move { to } => self.check_move(actor, to),
            MovementAction::Report { body } => self.check_report(actor, *body),
            MovementAction::PressButton => self.check_button(actor),
            MovementAction::Eliminate { target } => self.check_eliminate(actor, *target),
        }
    }

    /// A move must go to a neighbor. Moving to the current room is a stay
    /// and always legal.
    pub fn check_move(&self, actor: &AgentRecord, to: &RoomId) -> Result<(), RejectionReason> {
        if &actor.room == to || self.graph.is_adjacent(&actor.room, to) {
            Ok(())
        } else {
            Err(RejectionReason::NotAdjacent)
        }
    }

    /// A report needs the named body in the reporter's room.
    pub fn check_report(&self, actor: &AgentRecord, body: AgentId) -> Result<(), RejectionReason> {
        if self
            .bodies
            .iter()
            .any(|b| b.deceased == body && b.room == actor.room)
        {
            Ok(())
        } else {
            Err(RejectionReason::NoBodyPresent)
        }
    }

    /// The button works once per game, in the meeting room.
    pub fn check_button(&self, actor: &AgentRecord) -> Result<(), RejectionReason> {
        if &actor.room != self.graph.meeting_room() {
            return Err(RejectionReason::NotInMeetingRoom);
        }
        if actor.button_used {
            return Err(RejectionReason::ButtonAlreadyUsed);
        }
        Ok(())
    }

    /// A Byzantine agent off cooldown may eliminate a co-located, active,
    /// honest agent.
    pub fn check_eliminate(
        &self,
        actor: &AgentRecord,
        target: AgentId,
    ) -> Result<(), RejectionReason> {
        if !actor.is_byzantine() {
            return Err(RejectionReason::NotByzantine);
        }
        if !actor.off_cooldown(self.global_step) {
            return Err(RejectionReason::OnCooldown);
        }
        let victim = self
            .agents
            .get(target)
            .ok_or(RejectionReason::TargetNotPresent)?;
        if !victim.is_active() {
            return Err(RejectionReason::TargetNotActive);
        }
        if victim.room != actor.room {
            return Err(RejectionReason::TargetNotPresent);
        }
        if victim.role() != Role::Honest {
            return Err(RejectionReason::TargetNotHonest);
        }
        Ok(())
    }

    /// Agents `actor` could legally eliminate right now, in canonical order.
    pub fn eliminable(&self, actor: &AgentRecord) -> Vec<AgentId> {
        if !actor.off_cooldown(self.global_step) {
            return Vec::new();
        }
        self.agents
            .active()
            .filter(|other| other.room == actor.room && other.role() == Role::Honest)
            .map(|other| other.id)
            .collect()
    }
}
