//! Movement sub-step resolution.
//!
//! Gathered actions are applied in three passes, each in canonical
//! agent-index order:
//!
//! 1. Eliminations, each validated against the state as it stands at its
//!    turn, so two Byzantine agents aiming at the same target yield one kill.
//! 2. Triggers (REPORT, BUTTON), validated after eliminations. The first
//!    valid one opens the meeting; later valid ones are superseded.
//! 3. Moves. When a trigger fired every agent is summoned to the meeting,
//!    so no move of that sub-step is applied.
//!
//! If the eliminations of pass 1 decide the game, passes 2 and 3 are
//! preempted: no meeting may reopen an outcome that is already settled.
//!
//! Illegal actions resolve as a stay and are recorded with their rejection
//! reason. The result depends only on the set of gathered actions, never on
//! the order they arrived in.

use std::collections::{BTreeMap, BTreeSet};

use airlock_agents::{AgentError, AgentRecord, ValidationContext};
use airlock_types::{
    ActionEntry, ActionOutcome, AgentId, Body, MeetingCause, MovementAction, RejectionReason,
    RoomId,
};
use airlock_world::RoomGraph;
use tracing::{debug, info};

use crate::config::GameRules;
use crate::fanout::Gathered;
use crate::state::GameState;
use crate::win;

/// The trigger that ended movement for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    /// Who reported or pressed the button.
    pub caller: AgentId,
    /// What kind of trigger.
    pub cause: MeetingCause,
    /// The reported body, for reports.
    pub body: Option<AgentId>,
}

/// Everything one sub-step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStepReport {
    /// One entry per gathered action, in canonical order.
    pub entries: Vec<ActionEntry>,
    /// Bodies deposited this sub-step.
    pub eliminations: Vec<Body>,
    /// The winning trigger, if any.
    pub trigger: Option<Trigger>,
}

fn validation_context<'a>(state: &'a GameState, graph: &'a RoomGraph) -> ValidationContext<'a> {
    ValidationContext {
        graph,
        agents: &state.agents,
        bodies: &state.bodies,
        global_step: state.global_step,
    }
}

/// Outcome for an action whose actor is no longer active.
fn inactive_outcome(started_active: &BTreeSet<AgentId>, id: AgentId) -> ActionOutcome {
    if started_active.contains(&id) {
        ActionOutcome::Preempted
    } else {
        ActionOutcome::Rejected {
            reason: RejectionReason::ActorInactive,
        }
    }
}

fn is_active(state: &GameState, id: AgentId) -> bool {
    state.agents.get(id).is_some_and(AgentRecord::is_active)
}

/// Apply one sub-step's gathered actions to `state`.
///
/// # Errors
///
/// Returns [`AgentError`] only if a validated status change is refused,
/// which means the store and the validator disagree.
pub fn resolve_sub_step(
    state: &mut GameState,
    graph: &RoomGraph,
    rules: &GameRules,
    decisions: BTreeMap<AgentId, Gathered<MovementAction>>,
) -> Result<SubStepReport, AgentError> {
    let start_rooms: BTreeMap<AgentId, RoomId> = decisions
        .keys()
        .filter_map(|id| state.agents.get(*id).map(|r| (*id, r.room.clone())))
        .collect();
    let started_active: BTreeSet<AgentId> = decisions
        .keys()
        .copied()
        .filter(|id| is_active(state, *id))
        .collect();

    let mut outcomes: BTreeMap<AgentId, ActionOutcome> = BTreeMap::new();
    let mut actions: BTreeMap<AgentId, MovementAction> = BTreeMap::new();
    for (id, gathered) in decisions {
        if let Some(reason) = gathered.degraded() {
            outcomes.insert(id, ActionOutcome::Degraded { reason });
        }
        actions.insert(id, gathered.into_value());
    }

    // Pass 1: eliminations.
    let mut eliminations = Vec::new();
    for (id, action) in &actions {
        let MovementAction::Eliminate { target } = action else {
            continue;
        };
        if outcomes.contains_key(id) {
            continue;
        }
        let verdict = match state.agents.get(*id) {
            Some(actor) => validation_context(state, graph).check(actor, action),
            None => Err(RejectionReason::ActorInactive),
        };
        let outcome = match verdict {
            Ok(()) => {
                state.agents.require_mut(*target)?.eliminate()?;
                let actor = state.agents.require_mut(*id)?;
                actor.record_kill(state.global_step, rules.elimination_cooldown_sub_steps);
                let body = Body {
                    room: actor.room.clone(),
                    deceased: *target,
                };
                info!(
                    round = state.round,
                    sub_step = state.sub_step,
                    room = %body.room,
                    "body deposited"
                );
                state.bodies.push(body.clone());
                eliminations.push(body);
                ActionOutcome::Applied
            }
            Err(reason) => ActionOutcome::Rejected { reason },
        };
        outcomes.insert(*id, outcome);
    }

    let settled = !eliminations.is_empty() && win::evaluate(&state.agents).is_decided();
    if settled {
        info!(round = state.round, sub_step = state.sub_step, "eliminations decided the game");
    }

    // Pass 2: triggers, against the post-elimination state.
    let mut trigger: Option<Trigger> = None;
    for (id, action) in &actions {
        if !action.is_trigger() || outcomes.contains_key(id) {
            continue;
        }
        if !is_active(state, *id) {
            outcomes.insert(*id, inactive_outcome(&started_active, *id));
            continue;
        }
        if settled {
            outcomes.insert(*id, ActionOutcome::Preempted);
            continue;
        }
        let verdict = match state.agents.get(*id) {
            Some(actor) => validation_context(state, graph).check(actor, action),
            None => Err(RejectionReason::ActorInactive),
        };
        let outcome = match verdict {
            Err(reason) => ActionOutcome::Rejected { reason },
            Ok(()) if trigger.is_some() => ActionOutcome::Superseded,
            Ok(()) => {
                trigger = Some(match action {
                    MovementAction::Report { body } => Trigger {
                        caller: *id,
                        cause: MeetingCause::BodyReport,
                        body: Some(*body),
                    },
                    _ => Trigger {
                        caller: *id,
                        cause: MeetingCause::EmergencyButton,
                        body: None,
                    },
                });
                ActionOutcome::Applied
            }
        };
        outcomes.insert(*id, outcome);
    }
    if let Some(fired) = trigger {
        apply_trigger(state, fired)?;
    }

    // Pass 3: moves.
    for (id, action) in &actions {
        if outcomes.contains_key(id) {
            continue;
        }
        if !is_active(state, *id) {
            outcomes.insert(*id, inactive_outcome(&started_active, *id));
            continue;
        }
        let outcome = match action {
            MovementAction::Move { .. } if settled || trigger.is_some() => ActionOutcome::Preempted,
            MovementAction::Move { to } => {
                let verdict = match state.agents.get(*id) {
                    Some(actor) => validation_context(state, graph).check_move(actor, to),
                    None => Err(RejectionReason::ActorInactive),
                };
                match verdict {
                    Ok(()) => {
                        let actor = state.agents.require_mut(*id)?;
                        if &actor.room != to {
                            actor.room = to.clone();
                            actor.stats.moves = actor.stats.moves.saturating_add(1);
                        }
                        ActionOutcome::Applied
                    }
                    Err(reason) => ActionOutcome::Rejected { reason },
                }
            }
            _ => ActionOutcome::Applied,
        };
        outcomes.insert(*id, outcome);
    }

    // Tasks complete by ending a sub-step in the task room.
    for record in state.agents.iter_mut() {
        if record.is_active()
            && record.task_room.as_ref() == Some(&record.room)
            && !record.task_done
        {
            record.task_done = true;
            debug!(agent_id = %record.id, room = %record.room, "task completed");
        }
    }

    let mut entries = Vec::with_capacity(actions.len());
    for (id, action) in actions {
        let outcome = outcomes
            .get(&id)
            .copied()
            .unwrap_or(ActionOutcome::Applied);
        if matches!(
            outcome,
            ActionOutcome::Degraded { .. } | ActionOutcome::Rejected { .. }
        ) && let Some(record) = state.agents.get_mut(id)
        {
            record.stats.degraded_decisions = record.stats.degraded_decisions.saturating_add(1);
        }
        let Some(record) = state.agents.get(id) else {
            continue;
        };
        let to_room = record.room.clone();
        let from_room = start_rooms.get(&id).cloned().unwrap_or_else(|| to_room.clone());
        entries.push(ActionEntry {
            game_id: state.game_id,
            round: state.round,
            sub_step: state.sub_step,
            agent_id: id,
            witnessed: state
                .agents
                .active_in(&to_room)
                .into_iter()
                .filter(|other| *other != id)
                .collect(),
            bodies_seen: state
                .bodies
                .iter()
                .filter(|b| b.room == to_room)
                .map(|b| b.deceased)
                .collect(),
            from_room,
            to_room,
            action,
            outcome,
        });
    }

    Ok(SubStepReport {
        entries,
        eliminations,
        trigger,
    })
}

fn apply_trigger(state: &mut GameState, trigger: Trigger) -> Result<(), AgentError> {
    match trigger.cause {
        MeetingCause::EmergencyButton => {
            for record in state.agents.iter_mut() {
                record.button_used = true;
            }
            let caller = state.agents.require_mut(trigger.caller)?;
            caller.stats.emergency_meetings = caller.stats.emergency_meetings.saturating_add(1);
        }
        MeetingCause::BodyReport => {
            let caller = state.agents.require_mut(trigger.caller)?;
            caller.stats.bodies_reported = caller.stats.bodies_reported.saturating_add(1);
        }
    }
    info!(
        round = state.round,
        sub_step = state.sub_step,
        caller = %trigger.caller,
        cause = %trigger.cause,
        "meeting triggered"
    );
    Ok(())
}
