//! Decision oracle trait and scripted implementation.
//!
//! During every phase the scheduler asks each active agent's oracle for one
//! decision. The [`DecisionOracle`] trait abstracts where decisions come from:
//! an LLM backend, a scripted bot, or a test double. Calls return boxed
//! `'static` futures so the scheduler can spawn one task per agent and race
//! them against a deadline.
//!
//! The [`ScriptedOracle`] answers from a fixed script. It can also delay,
//! fail, or never answer for chosen agents, which lets tests drive the
//! timeout and failure paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use airlock_types::{AgentId, Ballot, MeetingContext, MovementAction, Utterance, WorldView};
use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Errors an oracle may report for one decision.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The agent did not respond within the deadline.
    #[error("agent {agent_id} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The agent that timed out.
        agent_id: AgentId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// The decision source failed (network, backend, template).
    #[error("decision source error: {message}")]
    Failed {
        /// Description of the error.
        message: String,
    },

    /// The source answered with something that maps to no legal decision.
    #[error("unparseable decision: {raw}")]
    Unparseable {
        /// The raw answer.
        raw: String,
    },
}

/// Future returned by every oracle call.
pub type DecisionFuture<T> = BoxFuture<'static, Result<T, DecisionError>>;

/// A source of agent decisions.
///
/// Implementations receive owned snapshots and must not hold references
/// into live game state. Every call may be slow or fail; the scheduler
/// bounds each with a deadline and substitutes the safe default.
pub trait DecisionOracle: Send + Sync {
    /// Choose a movement-phase action.
    fn decide_movement(&self, view: WorldView) -> DecisionFuture<MovementAction>;

    /// Speak once in the current discussion turn.
    fn discuss(&self, context: MeetingContext) -> DecisionFuture<Utterance>;

    /// Vote for a candidate or skip.
    fn vote(&self, candidates: Vec<AgentId>, context: MeetingContext) -> DecisionFuture<Ballot>;
}

/// How a scripted agent behaves when asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responsiveness {
    /// Answer after the given delay.
    Delayed(Duration),
    /// Return [`DecisionError::Failed`].
    Failing,
    /// Never resolve.
    Silent,
}

#[derive(Debug, Default)]
struct Script {
    moves: BTreeMap<(u32, u32, AgentId), MovementAction>,
    utterances: BTreeMap<(u32, u32, AgentId), String>,
    votes: BTreeMap<(u32, AgentId), Ballot>,
    behaviour: BTreeMap<AgentId, Responsiveness>,
    silent_votes: BTreeSet<AgentId>,
}

/// An oracle that plays back a fixed script.
///
/// Unscripted movement is [`MovementAction::Stay`], unscripted discussion
/// states the speaker's room, and unscripted votes are [`Ballot::Skip`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    script: Arc<Script>,
}

/// Builder for [`ScriptedOracle`].
#[derive(Debug, Default)]
pub struct ScriptedOracleBuilder {
    script: Script,
}

impl ScriptedOracle {
    /// An oracle that always stays, speaks its room and skips.
    pub fn passive() -> Self {
        Self::default()
    }

    /// Start building a script.
    pub fn builder() -> ScriptedOracleBuilder {
        ScriptedOracleBuilder::default()
    }

    fn behaviour(&self, agent: AgentId) -> Responsiveness {
        self.script
            .behaviour
            .get(&agent)
            .copied()
            .unwrap_or(Responsiveness::Delayed(Duration::ZERO))
    }
}

impl ScriptedOracleBuilder {
    /// Script a movement action for `agent` at `(round, sub_step)`.
    #[must_use]
    pub fn movement(
        mut self,
        round: u32,
        sub_step: u32,
        agent: AgentId,
        action: MovementAction,
    ) -> Self {
        self.script.moves.insert((round, sub_step, agent), action);
        self
    }

    /// Script what `agent` says in `turn` of the meeting held in `round`.
    #[must_use]
    pub fn utterance(
        mut self,
        round: u32,
        turn: u32,
        agent: AgentId,
        text: impl Into<String>,
    ) -> Self {

        self.script.utterances.insert((round, turn, agent), text.into());
        self
    }

    /// Script `agent`'s ballot in the meeting held in `round`.
    #[must_use]
    pub fn vote(mut self, round: u32, agent: AgentId, ballot: Ballot) -> Self {
        self.script.votes.insert((round, agent), ballot);
        self
    }

    /// Set how `agent` responds to every call.
    #[must_use]
    pub fn responsiveness(mut self, agent: AgentId, behaviour: Responsiveness) -> Self {
        self.script.behaviour.insert(agent, behaviour);
        self
    }

    /// Make `agent` never answer vote requests.
    #[must_use]
    pub fn silent_when_voting(mut self, agent: AgentId) -> Self {
        self.script.silent_votes.insert(agent);
        self
    }

    /// Finish the script.
    pub fn build(self) -> ScriptedOracle {
        ScriptedOracle {
            script: Arc::new(self.script),
        }
    }
}

fn respond<T: Send + 'static>(behaviour: Responsiveness, value: T) -> DecisionFuture<T> {
    Box::pin(async move {
        match behaviour {
            Responsiveness::Delayed(delay) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(value)
            }
            Responsiveness::Failing => Err(DecisionError::Failed {
                message: "scripted failure".to_owned(),
            }),
            Responsiveness::Silent => std::future::pending().await,
        }
    })
}

impl DecisionOracle for ScriptedOracle {
    fn decide_movement(&self, view: WorldView) -> DecisionFuture<MovementAction> {
        let agent = view.self_state.id;
        let action = self
            .script
            .moves
            .get(&(view.round, view.sub_step, agent))
            .cloned()
            .unwrap_or(MovementAction::Stay);
        respond(self.behaviour(agent), action)
    }

    fn discuss(&self, context: MeetingContext) -> DecisionFuture<Utterance> {
        let agent = context.self_state.id;
        let text = self
            .script
            .utterances
            .get(&(context.round, context.turn, agent))
            .cloned()
            .unwrap_or_else(|| format!("I was in {}.", context.self_state.room));
        respond(self.behaviour(agent), Utterance::new(text))
    }

    fn vote(&self, _candidates: Vec<AgentId>, context: MeetingContext) -> DecisionFuture<Ballot> {
        let agent = context.self_state.id;
        if self.script.silent_votes.contains(&agent) {
            return respond(Responsiveness::Silent, Ballot::Skip);
        }
        let ballot = self
            .script
            .votes
            .get(&(context.round, agent))
            .copied()
            .unwrap_or(Ballot::Skip);
        respond(self.behaviour(agent), ballot)
    }
}

/// An oracle that picks uniformly among legal-looking options.
///
/// Byzantine agents eliminate whenever they can; everyone reports a body in
/// sight, otherwise wanders. Votes are random among candidates or SKIP.
/// Seeded, so a single-threaded run is reproducible.
#[derive(Debug)]
pub struct RandomOracle {
    rng: Mutex<StdRng>,
}

impl RandomOracle {
    /// Create a random oracle from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut rng)
    }
}

impl DecisionOracle for RandomOracle {
    fn decide_movement(&self, view: WorldView) -> DecisionFuture<MovementAction> {
        let action = self.with_rng(|rng| {
            if let Some(target) = view.eliminable.choose(rng) {
                return MovementAction::Eliminate { target: *target };
            }
            if let Some(body) = view.bodies.first() {
                return MovementAction::Report { body: *body };
            }
            if view.button_available && rng.random_bool(0.1) {
                return MovementAction::PressButton;
            }
            view.exits
                .choose(rng)
                .map_or(MovementAction::Stay, |to| MovementAction::Move { to: to.clone() })
        });
        Box::pin(async move { Ok(action) })
    }

    fn discuss(&self, context: MeetingContext) -> DecisionFuture<Utterance> {
        let text = format!("I was in {}.", context.self_state.room);
        Box::pin(async move { Ok(Utterance::new(text)) })
    }

    fn vote(&self, candidates: Vec<AgentId>, context: MeetingContext) -> DecisionFuture<Ballot> {
        let ballot = self.with_rng(|rng| {
            candidates
                .iter()
                .filter(|id| **id != context.self_state.id)
                .copied()
                .collect::<Vec<_>>()
                .choose(rng)
                .copied()
                .filter(|_| rng.random_bool(0.7))
                .map_or(Ballot::Skip, Ballot::Candidate)
        });
        Box::pin(async move { Ok(ballot) })
    }
}
