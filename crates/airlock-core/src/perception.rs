//! View assembly for the oracle.
//!
//! Each active agent gets its own snapshot. Visibility is limited to the
//! agent's current room: other active occupants and bodies there. Adjacent
//! rooms appear only as exit names. Byzantine agents additionally learn who
//! their teammates are and whom they could eliminate. No view ever records
//! who eliminated whom.

use airlock_agents::{AgentRecord, ValidationContext};
use airlock_types::{AgentId, MeetingContext, SelfState, WorldView};
use airlock_world::RoomGraph;

use crate::config::GameRules;
use crate::meeting::MeetingState;
use crate::state::GameState;

fn teammates(state: &GameState, agent: &AgentRecord) -> Vec<AgentId> {
    if !agent.is_byzantine() {
        return Vec::new();
    }
    state
        .agents
        .byzantine_ids()
        .into_iter()
        .filter(|id| *id != agent.id)
        .collect()
}

fn self_state(state: &GameState, agent: &AgentRecord) -> SelfState {
    agent.self_state(teammates(state, agent))
}

/// Build the movement-phase view for `agent`.
pub fn world_view(
    state: &GameState,
    graph: &RoomGraph,
    rules: &GameRules,
    agent: &AgentRecord,
) -> WorldView {
    let ctx = ValidationContext {
        graph,
        agents: &state.agents,
        bodies: &state.bodies,
        global_step: state.global_step,
    };
    let occupants = state
        .agents
        .active_in(&agent.room)
        .into_iter()
        .filter(|id| *id != agent.id)
        .collect();
    let bodies = state
        .bodies
        .iter()
        .filter(|b| b.room == agent.room)
        .map(|b| b.deceased)
        .collect();

    WorldView {
        game_id: state.game_id,
        round: state.round,
        sub_step: state.sub_step,
        max_sub_steps: rules.max_sub_steps,
        self_state: self_state(state, agent),
        occupants,
        bodies,
        exits: graph.neighbors(&agent.room).cloned().collect(),
        meeting_room: graph.meeting_room().clone(),
        button_available: ctx.check_button(agent).is_ok(),
        eliminable: ctx.eliminable(agent),
        active_count: u32::try_from(state.agents.active().count()).unwrap_or(u32::MAX),
    }
}

/// Build the meeting context for `agent` at `turn`.
pub fn meeting_context(
    state: &GameState,
    meeting: &MeetingState,
    agent: &AgentRecord,
    turn: u32,
    total_turns: u32,
) -> MeetingContext {
    MeetingContext {
        game_id: state.game_id,
        meeting_id: meeting.id,
        round: state.round,
        cause: meeting.cause,
        caller: meeting.caller,
        bodies: meeting.bodies.clone(),
        turn,
        total_turns,
        transcript: meeting.transcript.clone(),
        candidates: meeting.candidates.clone(),
        self_state: self_state(state, agent),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_agents::AgentStore;
    use airlock_types::{Body, GameId, Role, RoomId};
    use airlock_world::ship_graph;

    use super::*;

    fn agent(index: u32, role: Role, room: &str) -> AgentRecord {
        AgentRecord::new(AgentId::new(index), role, "m", "t", RoomId::from(room), None)
    }

    fn state() -> GameState {
        let mut s = GameState::new(
            GameId::new(),
            AgentStore::from_records([
                agent(1, Role::Honest, "Electrical"),
                agent(2, Role::Byzantine, "Electrical"),
                agent(3, Role::Honest, "Storage"),
                agent(4, Role::Byzantine, "Cafeteria"),
                agent(5, Role::Honest, "Electrical"),
            ])
            .unwrap(),
        );
        s.agents.get_mut(AgentId::new(5)).unwrap().eliminate().unwrap();
        s.bodies.push(Body {
            room: RoomId::from("Electrical"),
            deceased: AgentId::new(5),
        });
        s
    }

    #[test]
    fn view_is_limited_to_current_room() {
        let graph = ship_graph().unwrap();
        let s = state();
        let a1 = s.agents.get(AgentId::new(1)).unwrap();
        let view = world_view(&s, &graph, &GameRules::default(), a1);
        assert_eq!(view.occupants, vec![AgentId::new(2)]);
        assert_eq!(view.bodies, vec![AgentId::new(5)]);
        assert_eq!(view.exits, vec![RoomId::from("LowerEngine"), RoomId::from("Storage")]);
        assert!(!view.button_available);
        assert!(view.eliminable.is_empty());
        assert!(view.self_state.teammates.is_empty());
        assert_eq!(view.active_count, 4);
    }

    #[test]
    fn byzantine_view_lists_teammates_and_targets() {
        let graph = ship_graph().unwrap();
        let s = state();
        let a2 = s.agents.get(AgentId::new(2)).unwrap();
        let view = world_view(&s, &graph, &GameRules::default(), a2);
        assert_eq!(view.self_state.teammates, vec![AgentId::new(4)]);
        assert_eq!(view.eliminable, vec![AgentId::new(1)]);
    }

    #[test]
    fn button_available_in_meeting_room() {
        let graph = ship_graph().unwrap();
        let s = state();
        let a4 = s.agents.get(AgentId::new(4)).unwrap();
        let view = world_view(&s, &graph, &GameRules::default(), a4);
        assert!(view.button_available);
        assert!(view.bodies.is_empty());
    }
}
