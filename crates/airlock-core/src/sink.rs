//! Log and persistence sinks.
//!
//! The scheduler appends every [`LogRecord`] it produces to one
//! [`LogSink`]. Appends are best-effort: a failing sink is logged at `warn`
//! and the game carries on.
//!
//! [`MemoryLogStore`] keeps records in memory and answers round-range
//! queries. It doubles as agent memory for oracles that need to recall what
//! happened earlier in the game.

use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};

use airlock_types::{
    ActionEntry, AgentId, AgentMetadata, DiscussionEntry, FinalStats, GameId, LogRecord,
    ResultsEntry, RoundCounts,
};
use tracing::warn;

/// Errors a sink may report.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backend refused or failed the write.
    #[error("sink unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The sink was shut down.
    #[error("sink closed")]
    Closed,
}

/// Append-only destination for game records.
pub trait LogSink: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record could not be accepted.
    fn append(&self, record: LogRecord) -> Result<(), SinkError>;
}

/// Append `record`, logging instead of failing.
pub fn record_best_effort(sink: &dyn LogSink, record: LogRecord) {
    let round = record.round();
    if let Err(e) = sink.append(record) {
        warn!(error = %e, round, "log sink write failed, continuing");
    }
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn append(&self, _record: LogRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Fans every record out to several sinks.
///
/// Every sink sees every record; the first error is returned after all
/// sinks were tried.
#[derive(Clone, Default)]
pub struct TeeSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl TeeSink {
    /// Create a tee over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// Add one more sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl std::fmt::Debug for TeeSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeSink").field("sinks", &self.sinks.len()).finish()
    }
}

impl LogSink for TeeSink {
    fn append(&self, record: LogRecord) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.append(record.clone()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// In-memory, round-indexed record store.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    records: RwLock<Vec<LogRecord>>,
}

impl MemoryLogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn select<T>(&self, pick: impl Fn(&LogRecord) -> Option<T>) -> Vec<T> {
        // A poisoned lock still holds every record appended before the panic.
        let records = self
            .records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        records.iter().filter_map(pick).collect()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Agent metadata recorded at game start.
    pub fn agents(&self, game_id: GameId) -> Vec<AgentMetadata> {
        self.select(|r| match r {
            LogRecord::Agent(e) if e.game_id == game_id => Some(e.clone()),
            _ => None,
        })
    }

    /// Action entries in `rounds`, optionally for one agent only.
    pub fn actions(
        &self,
        game_id: GameId,
        agent: Option<AgentId>,
        rounds: RangeInclusive<u32>,
    ) -> Vec<ActionEntry> {
        self.select(|r| match r {
            LogRecord::Action(e)
                if e.game_id == game_id
                    && rounds.contains(&e.round)
                    && agent.is_none_or(|a| a == e.agent_id) =>
            {
                Some(e.clone())
            }
            _ => None,
        })
    }

    /// Discussion entries in `rounds`.
    pub fn discussion(&self, game_id: GameId, rounds: RangeInclusive<u32>) -> Vec<DiscussionEntry> {
        self.select(|r| match r {
            LogRecord::Discussion(e) if e.game_id == game_id && rounds.contains(&e.round) => {
                Some(e.clone())
            }
            _ => None,
        })
    }

    /// Meeting results in `rounds`.
    pub fn results(&self, game_id: GameId, rounds: RangeInclusive<u32>) -> Vec<ResultsEntry> {
        self.select(|r| match r {
            LogRecord::Results(e) if e.game_id == game_id && rounds.contains(&e.round) => {
                Some(e.clone())
            }
            _ => None,
        })
    }

    /// Alive/dead counts, round 0 first.
    pub fn round_counts(&self, game_id: GameId) -> Vec<RoundCounts> {
        self.select(|r| match r {
            LogRecord::Round(e) if e.game_id == game_id => Some(e.clone()),
            _ => None,
        })
    }

    /// Final statistics, if the game is over.
    pub fn final_stats(&self, game_id: GameId) -> Vec<FinalStats> {
        self.select(|r| match r {
            LogRecord::Final(e) if e.game_id == game_id => Some(e.clone()),
            _ => None,
        })
    }
}

impl LogSink for MemoryLogStore {
    fn append(&self, record: LogRecord) -> Result<(), SinkError> {
        self.records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_types::{ActionOutcome, MovementAction, RoomId};

    use super::*;

    fn action(game_id: GameId, round: u32, agent: u32) -> LogRecord {
        LogRecord::Action(ActionEntry {
            game_id,
            round,
            sub_step: 0,
            agent_id: AgentId::new(agent),
            from_room: RoomId::from("Admin"),
            to_room: RoomId::from("Admin"),
            action: MovementAction::Stay,
            outcome: ActionOutcome::Applied,
            witnessed: Vec::new(),
            bodies_seen: Vec::new(),
        })
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn append(&self, _record: LogRecord) -> Result<(), SinkError> {
            Err(SinkError::Unavailable {
                message: "down".to_owned(),
            })
        }
    }

    #[test]
    fn actions_are_queried_by_round_range_and_agent() {
        let store = MemoryLogStore::new();
        let game = GameId::new();
        for round in 1..=3 {
            for agent in 1..=2 {
                store.append(action(game, round, agent)).unwrap();
            }
        }
        store.append(action(GameId::new(), 2, 1)).unwrap();

        assert_eq!(store.actions(game, None, 2..=3).len(), 4);
        let own = store.actions(game, Some(AgentId::new(1)), 2..=2);
        assert_eq!(own.len(), 1);
        assert_eq!(own.first().unwrap().round, 2);
        assert!(store.discussion(game, 0..=10).is_empty());
    }

    #[test]
    fn tee_reaches_every_sink_even_after_a_failure() {
        let memory = Arc::new(MemoryLogStore::new());
        let tee = TeeSink::default()
            .with(Arc::new(FailingSink))
            .with(memory.clone());
        let game = GameId::new();
        assert!(tee.append(action(game, 1, 1)).is_err());
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn best_effort_swallows_failures() {
        record_best_effort(&FailingSink, action(GameId::new(), 1, 1));
        record_best_effort(&NullSink, action(GameId::new(), 1, 1));
    }
}
