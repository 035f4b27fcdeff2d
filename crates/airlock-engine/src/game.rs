//! One engine session: the shared collaborators and the per-game wiring.
//!
//! A [`Session`] is built once at startup. Each call to [`Session::play`]
//! seats a fresh roster, gives the game its own in-memory log (which also
//! serves as agent memory), picks the oracle and hands everything to the
//! scheduler.

use std::sync::Arc;

use airlock_agents::{AgentStore, RosterPlan, seat_roster};
use airlock_core::config::{GameRules, OracleKind};
use airlock_core::control::GameControl;
use airlock_core::decision::{DecisionOracle, RandomOracle};
use airlock_core::scheduler::{GameContext, GameResult, run_game};
use airlock_core::sink::{LogSink, MemoryLogStore, TeeSink};
use airlock_core::snapshot::{NoOpObserver, PhaseObserver};
use airlock_core::state::GameState;
use airlock_observer::AppState;
use airlock_runner::config::RunnerConfig;
use airlock_runner::oracle::LlmOracle;
use airlock_runner::prompt::PromptEngine;
use airlock_types::GameId;
use airlock_world::RoomGraph;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Everything needed to produce decisions with LLM backends.
pub struct LlmSetup {
    /// Endpoints and limits.
    pub config: RunnerConfig,
    /// Prompt templates.
    pub prompts: Arc<PromptEngine>,
}

/// Collaborators shared by every game of a run.
pub struct Session {
    /// The map.
    pub graph: RoomGraph,
    /// Pacing and rules.
    pub rules: GameRules,
    /// How rosters are seated.
    pub plan: RosterPlan,
    /// LLM wiring; `None` plays with the random oracle.
    pub llm: Option<LlmSetup>,
    /// Durable sink shared across games, if configured.
    pub persistent: Option<Arc<dyn LogSink>>,
    /// Observer state to publish snapshots to, if enabled.
    pub observer: Option<Arc<AppState>>,
    /// Stop signal.
    pub control: Arc<GameControl>,
}

impl Session {
    /// Which oracle this session plays with.
    pub const fn oracle_kind(&self) -> OracleKind {
        if self.llm.is_some() {
            OracleKind::Llm
        } else {
            OracleKind::Random
        }
    }

    /// Play one game seeded with `seed`.
    ///
    /// The seed drives seating and, for the random oracle, every decision.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Roster`] if seating fails,
    /// [`EngineError::Runner`] if the LLM oracle cannot be built, and
    /// [`EngineError::Game`] if the game aborts or breaks.
    pub async fn play(&self, seed: u64) -> Result<GameResult, EngineError> {
        let game_id = GameId::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let agents = seat_roster(&self.plan, &self.graph, &mut rng)?;
        info!(
            %game_id,
            seed,
            agents = agents.len(),
            oracle = ?self.oracle_kind(),
            "roster seated"
        );

        let memory = Arc::new(MemoryLogStore::new());
        let mut sink = TeeSink::new(vec![Arc::clone(&memory) as Arc<dyn LogSink>]);
        if let Some(persistent) = &self.persistent {
            sink = sink.with(Arc::clone(persistent));
        }

        let oracle = self.oracle(&agents, &memory, seed)?;
        let mut observer: Box<dyn PhaseObserver> = self.observer.as_ref().map_or_else(
            || Box::new(NoOpObserver) as Box<dyn PhaseObserver>,
            |state| Box::new(ObserverCallback::new(Arc::clone(state))),
        );

        let ctx = GameContext {
            graph: &self.graph,
            rules: &self.rules,
            oracle: oracle.as_ref(),
            sink: &sink,
            control: &self.control,
        };
        let result = run_game(GameState::new(game_id, agents), ctx, observer.as_mut()).await?;
        Ok(result)
    }

    fn oracle(
        &self,
        agents: &AgentStore,
        memory: &Arc<MemoryLogStore>,
        seed: u64,
    ) -> Result<Box<dyn DecisionOracle>, EngineError> {
        let oracle: Box<dyn DecisionOracle> = match &self.llm {
            Some(llm) => Box::new(LlmOracle::new(
                agents,
                &self.graph,
                &llm.config,
                Arc::clone(&llm.prompts),
                Arc::clone(memory),
                self.rules.max_sub_steps,
            )?),
            None => Box::new(RandomOracle::seeded(seed)),
        };
        Ok(oracle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_core::config::AirlockConfig;
    use airlock_core::sink::NullSink;
    use airlock_types::Outcome;

    use super::*;

    fn random_session(observer: Option<Arc<AppState>>) -> Session {
        let config = AirlockConfig::default();
        Session {
            graph: config.room_graph().unwrap(),
            rules: config.rules(),
            plan: config.roster_plan(),
            llm: None,
            persistent: Some(Arc::new(NullSink)),
            observer,
            control: Arc::new(GameControl::new()),
        }
    }

    #[tokio::test]
    async fn random_game_reaches_an_outcome() {
        let session = random_session(None);
        assert_eq!(session.oracle_kind(), OracleKind::Random);

        let result = session.play(7).await.unwrap();
        assert_ne!(result.outcome, Outcome::Undecided);
        assert_eq!(result.final_stats.len(), 8);
        assert!(result.rounds <= session.rules.round_limit);
    }

    #[tokio::test]
    async fn observer_receives_the_final_snapshot() {
        let state = Arc::new(AppState::new());
        let session = random_session(Some(Arc::clone(&state)));

        let result = session.play(11).await.unwrap();
        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.game_id, result.game_id);
        assert_eq!(snapshot.outcome, result.outcome);
    }

    #[tokio::test]
    async fn stop_request_aborts_the_game() {
        let session = random_session(None);
        session.control.request_stop();

        let err = session.play(3).await.unwrap_err();
        assert!(matches!(err, EngineError::Game { .. }));
    }
}
