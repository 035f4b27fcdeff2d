//! The LLM-backed [`DecisionOracle`].
//!
//! Every agent gets a seat at construction: a persona fixed by its role
//! and a backend chosen by its model tag. Agents sharing a model share one
//! backend. Each decision renders the persona's prompt from the owned view,
//! recalls memory from the log store, calls the backend and parses the text
//! leniently into the legal action set.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use airlock_agents::AgentStore;
use airlock_core::decision::{DecisionError, DecisionFuture, DecisionOracle};
use airlock_core::sink::MemoryLogStore;
use airlock_types::{
    AgentId, Ballot, MeetingContext, MovementAction, Role, SelfState, Utterance, WorldView,
};
use airlock_world::RoomGraph;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::llm::{LlmBackend, create_backend};
use crate::memory::AgentMemory;
use crate::parse::{parse_ballot, parse_movement, parse_utterance};
use crate::prompt::{PromptEngine, PromptKind};

/// Sampling temperature for movement decisions.
const MOVEMENT_TEMPERATURE: f32 = 0.1;
/// Sampling temperature for discussion.
const DISCUSSION_TEMPERATURE: f32 = 1.0;
/// Sampling temperature for votes.
const VOTE_TEMPERATURE: f32 = 0.7;

/// How an agent is told to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Find and eject the Byzantine agents.
    Honest,
    /// Eliminate unseen and avoid ejection.
    Byzantine,
}

impl Persona {
    /// The persona for a fixed role.
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Honest => Self::Honest,
            Role::Byzantine => Self::Byzantine,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Honest => "Honest",
            Self::Byzantine => "Byzantine",
        }
    }
}

#[derive(Debug)]
struct Seat {
    persona: Persona,
    backend: Arc<LlmBackend>,
}

#[derive(Debug, Serialize)]
struct MapRoom {
    name: String,
    exits: Vec<String>,
}

#[derive(Debug)]
struct Inner {
    seats: BTreeMap<AgentId, Seat>,
    prompts: Arc<PromptEngine>,
    log: Arc<MemoryLogStore>,
    map: Vec<MapRoom>,
    max_sub_steps: u32,
}

/// Decision oracle that asks an LLM for every decision.
#[derive(Debug, Clone)]
pub struct LlmOracle {
    inner: Arc<Inner>,
}

impl LlmOracle {
    /// Seat every agent of `agents`.
    ///
    /// `log` must be the store the game's sink appends to; it is the
    /// agents' only memory. `max_sub_steps` is quoted in the rules prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] if the HTTP client cannot be
    /// built.
    pub fn new(
        agents: &AgentStore,
        graph: &RoomGraph,
        config: &RunnerConfig,
        prompts: Arc<PromptEngine>,
        log: Arc<MemoryLogStore>,
        max_sub_steps: u32,
    ) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("airlock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RunnerError::LlmBackend(format!("failed to build HTTP client: {e}")))?;

        let mut backends: BTreeMap<String, Arc<LlmBackend>> = BTreeMap::new();
        let mut seats = BTreeMap::new();
        for record in agents.iter() {
            let backend = backends
                .entry(record.model_tag.clone())
                .or_insert_with(|| {
                    Arc::new(create_backend(client.clone(), &config.backend_for(&record.model_tag)))
                })
                .clone();
            debug!(
                agent_id = %record.id,
                model = backend.model(),
                backend = backend.name(),
                "seated agent"
            );
            seats.insert(
                record.id,
                Seat {
                    persona: Persona::for_role(record.role()),
                    backend,
                },
            );
        }

        let map = graph
            .rooms()
            .map(|room| MapRoom {
                name: room.to_string(),
                exits: graph.neighbors(room).map(ToString::to_string).collect(),
            })
            .collect();

        Ok(Self {
            inner: Arc::new(Inner {
                seats,
                prompts,
                log,
                map,
                max_sub_steps,
            }),
        })
    }

    /// The persona bound to `agent`, if seated.
    pub fn persona(&self, agent: AgentId) -> Option<Persona> {
        self.inner.seats.get(&agent).map(|seat| seat.persona)
    }
}

impl Inner {
    fn seat(&self, agent: AgentId) -> Result<&Seat, RunnerError> {
        self.seats
            .get(&agent)
            .ok_or_else(|| RunnerError::UnknownAgent(agent.to_string()))
    }

    /// Context keys shared by every template.
    fn base_context(&self, persona: Persona, me: &SelfState, round: u32) -> serde_json::Value {
        json!({
            "name": me.id.to_string(),
            "role": persona.label(),
            "teammates": names(&me.teammates),
            "map": self.map,
            "max_sub_steps": self.max_sub_steps,
            "round": round,
            "room": me.room.to_string(),
            "task_room": me.task_room.as_ref().map(ToString::to_string),
            "task_done": me.task_done,
        })
    }

    fn movement_context(&self, persona: Persona, view: &WorldView) -> serde_json::Value {
        let memory = AgentMemory::new(&self.log, view.game_id);
        let mut actions: Vec<String> = view
            .eliminable
            .iter()
            .map(|target| format!("ELIMINATE {target}"))
            .collect();
        if !view.bodies.is_empty() {
            actions.push("REPORT".to_owned());
        }
        if view.button_available {
            actions.push("BUTTON".to_owned());
        }

        let mut context = self.base_context(persona, &view.self_state, view.round);
        merge(
            &mut context,
            json!({
                "max_sub_steps": view.max_sub_steps,
                "meeting_room": view.meeting_room.to_string(),
                "sub_step": view.sub_step,
                "active_count": view.active_count,
                "occupants": names(&view.occupants),
                "bodies": names(&view.bodies),
                "exits": view.exits.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "actions": actions,
                "eliminable": names(&view.eliminable),
                "own_actions": memory.own_actions(view.self_state.id, view.round),
                "results": memory.results(view.round),
            }),
        );
        context
    }

    fn meeting_context(&self, persona: Persona, meeting: &MeetingContext) -> serde_json::Value {
        let memory = AgentMemory::new(&self.log, meeting.game_id);
        let transcript: Vec<String> = meeting
            .transcript
            .iter()
            .filter(|entry| !entry.degraded && !entry.text.trim().is_empty())
            .map(|entry| format!("{}: {}", entry.speaker, entry.text))
            .collect();
        let bodies: Vec<String> = meeting
            .bodies
            .iter()
            .map(|body| format!("{} in {}", body.deceased, body.room))
            .collect();

        let mut context = self.base_context(persona, &meeting.self_state, meeting.round);
        merge(
            &mut context,
            json!({
                "caller": meeting.caller.to_string(),
                "cause": meeting.cause.to_string(),
                "bodies": bodies,
                "transcript": transcript,
                "turn": meeting.turn,
                "total_turns": meeting.total_turns,
                "candidates": names(&meeting.candidates),
                "active_count": meeting.candidates.len(),
                "own_actions": memory.own_actions(meeting.self_state.id, meeting.round),
                "results": memory.results(meeting.round.saturating_sub(1)),
            }),
        );
        context
    }

    async fn ask(
        &self,
        agent: AgentId,
        kind: PromptKind,
        context: &serde_json::Value,
        temperature: f32,
    ) -> Result<String, RunnerError> {
        let seat = self.seat(agent)?;
        let prompt = self.prompts.render(kind, context)?;
        let started = Instant::now();
        let raw = seat.backend.complete(&prompt, temperature).await?;
        debug!(
            agent_id = %agent,
            backend = seat.backend.name(),
            model = seat.backend.model(),
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "LLM responded"
        );
        Ok(raw)
    }

    async fn movement(&self, view: WorldView) -> Result<MovementAction, RunnerError> {
        let agent = view.self_state.id;
        let persona = self.seat(agent)?.persona;
        let context = self.movement_context(persona, &view);
        let raw = self.ask(agent, PromptKind::Movement, &context, MOVEMENT_TEMPERATURE).await?;
        parse_movement(&raw, &view)
    }

    async fn discussion(&self, meeting: MeetingContext) -> Result<Utterance, RunnerError> {
        let agent = meeting.self_state.id;
        let persona = self.seat(agent)?.persona;
        let context = self.meeting_context(persona, &meeting);
        let raw = self.ask(agent, PromptKind::Discussion, &context, DISCUSSION_TEMPERATURE).await?;
        parse_utterance(&raw, agent)
    }

    async fn ballot(
        &self,
        candidates: Vec<AgentId>,
        meeting: MeetingContext,
    ) -> Result<Ballot, RunnerError> {
        let agent = meeting.self_state.id;
        let persona = self.seat(agent)?.persona;
        let mut context = self.meeting_context(persona, &meeting);
        // The vote prompt reads this meeting back from the log.
        let said = AgentMemory::new(&self.log, meeting.game_id).discussion(meeting.round);
        merge(
            &mut context,
            json!({ "transcript": said, "candidates": names(&candidates) }),
        );
        let raw = self.ask(agent, PromptKind::Vote, &context, VOTE_TEMPERATURE).await?;
        parse_ballot(&raw, &candidates)
    }
}

impl DecisionOracle for LlmOracle {
    fn decide_movement(&self, view: WorldView) -> DecisionFuture<MovementAction> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.movement(view).await.map_err(DecisionError::from) })
    }

    fn discuss(&self, context: MeetingContext) -> DecisionFuture<Utterance> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.discussion(context).await.map_err(DecisionError::from) })
    }

    fn vote(&self, candidates: Vec<AgentId>, context: MeetingContext) -> DecisionFuture<Ballot> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner
                .ballot(candidates, context)
                .await
                .map_err(DecisionError::from)
        })
    }
}

fn names(ids: &[AgentId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// Overlay the keys of `extra` onto `base`.
fn merge(base: &mut serde_json::Value, extra: serde_json::Value) {
    if let (Some(base), serde_json::Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
}
