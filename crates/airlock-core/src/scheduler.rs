//! Round/phase scheduler: drives one game from setup to game over.
//!
//! Each round runs up to `max_sub_steps` movement sub-steps. Every sub-step
//! fans out one oracle call per active agent, joins them at a barrier, and
//! resolves the gathered actions in one deterministic pass. A trigger hands
//! the round to a meeting (discussion turns, then one vote); the round then
//! ends and the win condition decides between another round and game over.
//!
//! The scheduler is the only writer of [`GameState`]. Structural invariants
//! are checked after every resolution step; a violation aborts the game.

use airlock_agents::AgentError;
use airlock_types::{
    AgentId, AgentMetadata, Ballot, FeedKind, FinalStats, GameId, LogRecord, MovementAction,
    Outcome, Phase, Role, RoundCounts, Utterance,
};
use airlock_world::RoomGraph;
use tracing::{debug, info};

use crate::config::GameRules;
use crate::control::GameControl;
use crate::decision::{DecisionFuture, DecisionOracle};
use crate::fanout::{self, GatherAborted, GatherLabel, Gathered};
use crate::meeting::MeetingState;
use crate::movement::{self, Trigger};
use crate::perception;
use crate::sink::{LogSink, record_best_effort};
use crate::snapshot::{EventFeed, PhaseObserver, build_snapshot};
use crate::state::{GameState, InvariantViolation};
use crate::win;

/// Errors that end a game early.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A structural invariant broke.
    #[error("invariant violated: {source}")]
    Invariant {
        /// The violation.
        #[from]
        source: InvariantViolation,
    },

    /// The agent store refused a validated status change.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A stop was requested while a phase was being gathered.
    #[error("game aborted during {phase} of round {round}")]
    Aborted {
        /// Round being played.
        round: u32,
        /// Phase being gathered.
        phase: Phase,
    },
}

/// Collaborators of one game.
#[derive(Clone, Copy)]
pub struct GameContext<'a> {
    /// The map.
    pub graph: &'a RoomGraph,
    /// Pacing and rule parameters.
    pub rules: &'a GameRules,
    /// Where decisions come from.
    pub oracle: &'a dyn DecisionOracle,
    /// Where records go.
    pub sink: &'a dyn LogSink,
    /// Stop signal.
    pub control: &'a GameControl,
}

/// How a finished game ended.
#[derive(Debug)]
pub struct GameResult {
    /// Game identifier.
    pub game_id: GameId,
    /// Final outcome; never `Undecided`.
    pub outcome: Outcome,
    /// Rounds played.
    pub rounds: u32,
    /// Per-agent statistics, in canonical order.
    pub final_stats: Vec<FinalStats>,
    /// The terminal state.
    pub state: GameState,
}

/// Play one game to completion.
///
/// `state` must be a freshly seated setup state (round 0).
///
/// # Errors
///
/// Returns [`SchedulerError::Aborted`] if `ctx.control` requests a stop, or
/// [`SchedulerError::Invariant`] / [`SchedulerError::Agent`] if the state
/// machine breaks.
pub async fn run_game(
    state: GameState,
    ctx: GameContext<'_>,
    observer: &mut dyn PhaseObserver,
) -> Result<GameResult, SchedulerError> {
    let feed = EventFeed::new(ctx.rules.feed_capacity);
    let mut scheduler = Scheduler {
        ctx,
        observer,
        state,
        feed,
    };
    scheduler.run().await
}

const fn missing_meeting(phase: Phase) -> SchedulerError {
    SchedulerError::Invariant {
        source: InvariantViolation::MeetingPhase { phase },
    }
}

struct Scheduler<'c, 'o> {
    ctx: GameContext<'c>,
    observer: &'o mut dyn PhaseObserver,
    state: GameState,
    feed: EventFeed,
}

impl Scheduler<'_, '_> {
    async fn run(&mut self) -> Result<GameResult, SchedulerError> {
        self.state.check_invariants()?;
        info!(
            game_id = %self.state.game_id,
            agents = self.state.total_agents(),
            byzantine = self.state.agents.byzantine_ids().len(),
            round_limit = self.ctx.rules.round_limit,
            "game started"
        );
        for record in self.state.agents.iter() {
            self.log(LogRecord::Agent(AgentMetadata {
                game_id: self.state.game_id,
                agent_id: record.id,
                role: record.role(),
                model_tag: record.model_tag.clone(),
                display_tag: record.display_tag.clone(),
            }));
        }
        self.record_counts();
        self.publish();

        loop {
            self.state.round = self.state.round.saturating_add(1);
            self.state.sub_step = 0;
            let round = self.state.round;
            info!(round, active = self.state.agents.active().count(), "round started");
            self.feed.push(round, FeedKind::Phase, format!("Round {round} begins"));

            match self.movement_phase().await? {
                Some(trigger) => self.meeting(trigger).await?,
                None => self.state.transition(Phase::RoundEnd)?,
            }
            self.state.check_invariants()?;

            if let Some(outcome) = self.end_round() {
                self.state.outcome = outcome;
                self.state.transition(Phase::GameOver)?;
                self.state.check_invariants()?;
                self.feed.outcome(round, outcome);
                self.publish();
                break;
            }
            self.state.transition(Phase::Movement)?;
            self.publish();
        }

        Ok(self.finish())
    }

    /// Run movement sub-steps until a trigger fires, the outcome is decided
    /// by an elimination, or the sub-step budget runs out.
    async fn movement_phase(&mut self) -> Result<Option<Trigger>, SchedulerError> {
        let rules = self.ctx.rules;
        for sub_step in 0..rules.max_sub_steps {
            if sub_step > 0 {
                self.state.transition(Phase::Movement)?;
            }
            self.state.sub_step = sub_step;

            let calls: Vec<(AgentId, DecisionFuture<MovementAction>)> = self
                .state
                .agents
                .active()
                .map(|agent| {
                    let view = perception::world_view(&self.state, self.ctx.graph, rules, agent);
                    (agent.id, self.ctx.oracle.decide_movement(view))
                })
                .collect();
            let decisions = self
                .gather(Phase::Movement, calls, |_| MovementAction::Stay)
                .await?;

            let report =
                movement::resolve_sub_step(&mut self.state, self.ctx.graph, rules, decisions)?;
            self.state.global_step = self.state.global_step.saturating_add(1);
            self.state.check_invariants()?;
            debug!(
                round = self.state.round,
                sub_step,
                eliminations = report.eliminations.len(),
                "sub-step resolved"
            );

            for body in &report.eliminations {
                self.feed.body(self.state.round, body);
            }
            for entry in report.entries {
                self.log(LogRecord::Action(entry));
            }
            self.publish();

            if let Some(trigger) = report.trigger {
                return Ok(Some(trigger));
            }
            if !report.eliminations.is_empty() && win::evaluate(&self.state.agents).is_decided() {
                info!(round = self.state.round, sub_step, "outcome decided during movement");
                return Ok(None);
            }
        }
        Ok(None)
    }

    /// Hold a meeting for `trigger` and leave the state in `RoundEnd`.
    async fn meeting(&mut self, trigger: Trigger) -> Result<(), SchedulerError> {
        let round = self.state.round;
        let rules = self.ctx.rules;
        let opened = MeetingState::open(&mut self.state, trigger);
        self.state.meeting = Some(opened);
        self.state.transition(Phase::Discussion)?;
        self.state.check_invariants()?;
        self.feed.meeting(round, &trigger);
        self.publish();

        for turn in 0..rules.discussion_turns {
            let calls = self.meeting_calls(turn, |oracle, _, context| oracle.discuss(context))?;
            let utterances = self
                .gather(Phase::Discussion, calls, |_| Utterance::empty())
                .await?;
            let game_id = self.state.game_id;
            let entries = match self.state.meeting.as_mut() {
                Some(meeting) => {
                    meeting.append_turn(game_id, round, turn, utterances, &mut self.state.agents)
                }
                None => return Err(missing_meeting(Phase::Discussion)),
            };
            for entry in entries {
                self.log(LogRecord::Discussion(entry));
            }
        }

        self.state.transition(Phase::Voting)?;
        self.publish();
        let calls = self.meeting_calls(rules.discussion_turns, |oracle, candidates, context| {
            oracle.vote(candidates, context)
        })?;
        let ballots = self.gather(Phase::Voting, calls, |_| Ballot::Skip).await?;

        let Some(mut meeting) = self.state.meeting.take() else {
            return Err(missing_meeting(Phase::Voting));
        };
        meeting.record_votes(ballots, &mut self.state.agents);
        let results = meeting.resolve(&mut self.state)?;
        self.state.transition(Phase::RoundEnd)?;
        self.state.check_invariants()?;

        self.feed.vote(&results);
        self.log(LogRecord::Results(results));
        Ok(())
    }

    /// One call per meeting candidate that is still active.
    fn meeting_calls<T>(
        &self,
        turn: u32,
        call: impl Fn(
            &dyn DecisionOracle,
            Vec<AgentId>,
            airlock_types::MeetingContext,
        ) -> DecisionFuture<T>,
    ) -> Result<Vec<(AgentId, DecisionFuture<T>)>, SchedulerError> {
        let Some(meeting) = self.state.meeting.as_ref() else {
            return Err(missing_meeting(self.state.phase()));
        };
        let total_turns = self.ctx.rules.discussion_turns;
        Ok(self
            .state
            .agents
            .active()
            .map(|agent| {
                let context =
                    perception::meeting_context(&self.state, meeting, agent, turn, total_turns);

                (agent.id, call(self.ctx.oracle, meeting.candidates.clone(), context))
            })
            .collect())
    }

    async fn gather<T, F>(
        &self,
        phase: Phase,
        calls: Vec<(AgentId, DecisionFuture<T>)>,
        fallback: F,
    ) -> Result<std::collections::BTreeMap<AgentId, Gathered<T>>, SchedulerError>
    where
        T: Send + 'static,
        F: Fn(AgentId) -> T,
    {
        let round = self.state.round;
        let label = GatherLabel { phase, round };
        fanout::gather(label, calls, self.ctx.rules.decision_timeout, fallback, self.ctx.control)
            .await
            .map_err(|GatherAborted| SchedulerError::Aborted { round, phase })
    }

    /// Round-end bookkeeping. Returns the outcome if the game is over.
    fn end_round(&mut self) -> Option<Outcome> {
        for record in self.state.agents.iter_mut() {
            if record.is_active() {
                record.stats.rounds_survived = record.stats.rounds_survived.saturating_add(1);
            }
        }
        self.record_counts();

        let round = self.state.round;
        let outcome = if round >= self.ctx.rules.round_limit {
            win::evaluate_at_limit(&self.state.agents)
        } else {
            win::evaluate(&self.state.agents)
        };
        let (alive, dead) = self.state.alive_dead();
        info!(round, alive, dead, outcome = %outcome, "round ended");
        outcome.is_decided().then_some(outcome)
    }

    fn finish(&self) -> GameResult {
        let outcome = self.state.outcome;
        let final_stats: Vec<FinalStats> = self
            .state
            .agents
            .iter()
            .map(|record| FinalStats {
                game_id: self.state.game_id,
                agent_id: record.id,
                role: record.role(),
                won: matches!(
                    (record.role(), outcome),
                    (Role::Honest, Outcome::Win) | (Role::Byzantine, Outcome::Lose)
                ),
                outcome,
                stats: record.stats,
            })
            .collect();
        for stats in &final_stats {
            self.log(LogRecord::Final(stats.clone()));
        }
        info!(
            game_id = %self.state.game_id,
            outcome = %outcome,
            rounds = self.state.round,
            "game over"
        );
        GameResult {
            game_id: self.state.game_id,
            outcome,
            rounds: self.state.round,
            final_stats,
            state: self.state.clone(),
        }
    }

    fn record_counts(&self) {
        let (alive, dead) = self.state.alive_dead();
        self.log(LogRecord::Round(RoundCounts {
            game_id: self.state.game_id,
            round: self.state.round,
            alive: u32::try_from(alive).unwrap_or(u32::MAX),
            dead: u32::try_from(dead).unwrap_or(u32::MAX),
        }));
    }

    fn log(&self, record: LogRecord) {
        record_best_effort(self.ctx.sink, record);
    }

    fn publish(&mut self) {
        let snapshot = build_snapshot(&self.state, self.ctx.graph, &self.feed);
        self.observer.on_phase(&snapshot);
    }
}
