//! Round-indexed game log tables.
//!
//! One insert per [`LogRecord`] variant, and range queries that mirror the
//! in-memory store: actions, discussion and results by round range, plus
//! per-game metadata, round counts and final statistics.

use std::ops::RangeInclusive;

use airlock_types::{
    ActionEntry, AgentId, AgentMetadata, DiscussionEntry, FinalStats, LogRecord, ResultsEntry,
    RoundCounts,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the log tables.
#[derive(Debug, Clone, Copy)]
pub struct LogStore<'a> {
    pool: &'a PgPool,
}

fn int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn agent(id: AgentId) -> i32 {
    int(id.index())
}

fn seat_indices(ids: &[AgentId]) -> Vec<i32> {
    ids.iter().copied().map(agent).collect()
}

impl<'a> LogStore<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist one record.
    ///
    /// Agent metadata, round counts and final statistics are keyed; a
    /// repeated key never adds a second row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails and
    /// [`DbError::Serialization`] if a JSON column cannot be built.
    pub async fn insert(&self, record: &LogRecord) -> Result<(), DbError> {
        match record {
            LogRecord::Agent(meta) => self.insert_agent(meta).await,
            LogRecord::Action(entry) => self.insert_action(entry).await,
            LogRecord::Discussion(entry) => self.insert_discussion(entry).await,
            LogRecord::Results(entry) => self.insert_results(entry).await,
            LogRecord::Round(counts) => self.insert_round(counts).await,
            LogRecord::Final(fin) => self.insert_final(fin).await,
        }
    }

    async fn insert_agent(&self, meta: &AgentMetadata) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO agents (game_id, agent_id, role, model_tag, display_tag)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (game_id, agent_id) DO UPDATE
              SET role = EXCLUDED.role, model_tag = EXCLUDED.model_tag, display_tag = EXCLUDED.display_tag",
        )
        .bind(meta.game_id.into_inner())
        .bind(agent(meta.agent_id))
        .bind(meta.role.to_string())
        .bind(&meta.model_tag)
        .bind(&meta.display_tag)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_action(&self, entry: &ActionEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO action_log (game_id, round, sub_step, agent_id, from_room, to_room, action, detail, outcome, witnessed, bodies_seen)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(entry.game_id.into_inner())
        .bind(int(entry.round))
        .bind(int(entry.sub_step))
        .bind(agent(entry.agent_id))
        .bind(entry.from_room.as_str())
        .bind(entry.to_room.as_str())
        .bind(entry.action.keyword())
        .bind(serde_json::to_value(&entry.action)?)
        .bind(entry.outcome.to_string())
        .bind(seat_indices(&entry.witnessed))
        .bind(seat_indices(&entry.bodies_seen))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_discussion(&self, entry: &DiscussionEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO discussion_log (game_id, meeting_id, round, agent_id, turn, text, degraded)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.game_id.into_inner())
        .bind(entry.meeting_id.into_inner())
        .bind(int(entry.round))
        .bind(agent(entry.agent_id))
        .bind(int(entry.turn))
        .bind(&entry.text)
        .bind(entry.degraded)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_results(&self, entry: &ResultsEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO results_log (game_id, meeting_id, round, cause, caller, bodies, tally, skips, ejected, remaining_active)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(entry.game_id.into_inner())
        .bind(entry.meeting_id.into_inner())
        .bind(int(entry.round))
        .bind(entry.cause.to_string())
        .bind(agent(entry.caller))
        .bind(serde_json::to_value(&entry.bodies)?)
        .bind(serde_json::to_value(&entry.tally)?)
        .bind(int(entry.skips))
        .bind(entry.ejected.map(agent))
        .bind(int(entry.remaining_active))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_round(&self, counts: &RoundCounts) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO round_counts (game_id, round, alive, dead)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (game_id, round) DO UPDATE SET alive = EXCLUDED.alive, dead = EXCLUDED.dead",
        )
        .bind(counts.game_id.into_inner())
        .bind(int(counts.round))
        .bind(int(counts.alive))
        .bind(int(counts.dead))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_final(&self, fin: &FinalStats) -> Result<(), DbError> {
        let s = &fin.stats;
        sqlx::query(
            r"INSERT INTO final_stats (game_id, agent_id, role, won, outcome, votes_received, correct_votes, incorrect_votes,
                  skipped_votes, emergency_meetings, bodies_reported, rounds_survived, eliminations, times_eliminated,
                  ejections, moves, degraded_decisions)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
              ON CONFLICT (game_id, agent_id) DO NOTHING",
        )
        .bind(fin.game_id.into_inner())
        .bind(agent(fin.agent_id))
        .bind(fin.role.to_string())
        .bind(fin.won)
        .bind(fin.outcome.to_string())
        .bind(int(s.votes_received))
        .bind(int(s.correct_votes))
        .bind(int(s.incorrect_votes))
        .bind(int(s.skipped_votes))
        .bind(int(s.emergency_meetings))
        .bind(int(s.bodies_reported))
        .bind(int(s.rounds_survived))
        .bind(int(s.eliminations))
        .bind(int(s.times_eliminated))
        .bind(int(s.ejections))
        .bind(int(s.moves))
        .bind(int(s.degraded_decisions))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Agent metadata of a game, in seat order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn agents(&self, game_id: Uuid) -> Result<Vec<AgentRow>, DbError> {
        let rows = sqlx::query_as::<_, AgentRow>(
            r"SELECT game_id, agent_id, role, model_tag, display_tag
              FROM agents WHERE game_id = $1 ORDER BY agent_id",
        )
        .bind(game_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Actions resolved in `rounds`, in sub-step then seat order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn actions(
        &self,
        game_id: Uuid,
        rounds: RangeInclusive<u32>,
    ) -> Result<Vec<ActionRow>, DbError> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r"SELECT id, game_id, round, sub_step, agent_id, from_room, to_room, action, detail, outcome, witnessed, bodies_seen, created_at
              FROM action_log
              WHERE game_id = $1 AND round >= $2 AND round <= $3
              ORDER BY round, sub_step, agent_id",
        )
        .bind(game_id)
        .bind(int(*rounds.start()))
        .bind(int(*rounds.end()))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Utterances made in `rounds`, in turn then seat order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn discussion(
        &self,
        game_id: Uuid,
        rounds: RangeInclusive<u32>,
    ) -> Result<Vec<DiscussionRow>, DbError> {
        let rows = sqlx::query_as::<_, DiscussionRow>(
            r"SELECT id, game_id, meeting_id, round, agent_id, turn, text, degraded
              FROM discussion_log
              WHERE game_id = $1 AND round >= $2 AND round <= $3
              ORDER BY round, turn, agent_id",
        )
        .bind(game_id)
        .bind(int(*rounds.start()))
        .bind(int(*rounds.end()))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Meetings resolved in `rounds`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn results(
        &self,
        game_id: Uuid,
        rounds: RangeInclusive<u32>,
    ) -> Result<Vec<ResultsRow>, DbError> {

        let rows = sqlx::query_as::<_, ResultsRow>(
            r"SELECT id, game_id, meeting_id, round, cause, caller, bodies, tally, skips, ejected, remaining_active
              FROM results_log
              WHERE game_id = $1 AND round >= $2 AND round <= $3
              ORDER BY round",
        )
        .bind(game_id)
        .bind(int(*rounds.start()))
        .bind(int(*rounds.end()))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Alive/dead counts per round.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn round_counts(&self, game_id: Uuid) -> Result<Vec<RoundCountRow>, DbError> {
        let rows = sqlx::query_as::<_, RoundCountRow>(
            r"SELECT game_id, round, alive, dead FROM round_counts WHERE game_id = $1 ORDER BY round",
        )
        .bind(game_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Final statistics, in seat order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn final_stats(&self, game_id: Uuid) -> Result<Vec<FinalStatsRow>, DbError> {
        let rows = sqlx::query_as::<_, FinalStatsRow>(
            r"SELECT game_id, agent_id, role, won, outcome, votes_received, correct_votes, incorrect_votes, skipped_votes,
                     emergency_meetings, bodies_reported, rounds_survived, eliminations, times_eliminated, ejections,
                     moves, degraded_decisions
              FROM final_stats WHERE game_id = $1 ORDER BY agent_id",
        )
        .bind(game_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// A row of `agents`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgentRow {
    /// Game.
    pub game_id: Uuid,
    /// Seat index.
    pub agent_id: i32,
    /// `honest` or `byzantine`.
    pub role: String,
    /// Model tag.
    pub model_tag: String,
    /// Display tag.
    pub display_tag: String,
}

/// A row of `action_log`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionRow {
    /// Insertion order.
    pub id: i64,
    /// Game.
    pub game_id: Uuid,
    /// Round.
    pub round: i32,
    /// Sub-step within the round.
    pub sub_step: i32,
    /// Acting agent.
    pub agent_id: i32,
    /// Room before the sub-step.
    pub from_room: String,
    /// Room after the sub-step.
    pub to_room: String,
    /// Action keyword.
    pub action: String,
    /// The full action as JSON.
    pub detail: serde_json::Value,
    /// Resolution outcome.
    pub outcome: String,
    /// Co-located agents at sub-step end.
    pub witnessed: Vec<i32>,
    /// Bodies in the room at sub-step end.
    pub bodies_seen: Vec<i32>,
    /// When the writer inserted the row.
    pub created_at: DateTime<Utc>,
}

/// A row of `discussion_log`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscussionRow {
    /// Insertion order.
    pub id: i64,
    /// Game.
    pub game_id: Uuid,
    /// Meeting.
    pub meeting_id: Uuid,
    /// Round.
    pub round: i32,
    /// Speaker.
    pub agent_id: i32,
    /// Zero-based turn.
    pub turn: i32,
    /// What was said.
    pub text: String,
    /// Whether the speaker's answer was replaced by silence.
    pub degraded: bool,
}

/// A row of `results_log`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultsRow {
    /// Insertion order.
    pub id: i64,
    /// Game.
    pub game_id: Uuid,
    /// Meeting.
    pub meeting_id: Uuid,
    /// Round.
    pub round: i32,
    /// `body_report` or `emergency_button`.
    pub cause: String,
    /// Caller seat index.
    pub caller: i32,
    /// Bodies cleared at the meeting.
    pub bodies: serde_json::Value,
    /// Votes per candidate.
    pub tally: serde_json::Value,
    /// SKIP ballots.
    pub skips: i32,
    /// Ejected seat index, if any.
    pub ejected: Option<i32>,
    /// Active agents after the meeting.
    pub remaining_active: i32,
}

/// A row of `round_counts`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoundCountRow {
    /// Game.
    pub game_id: Uuid,
    /// Round; 0 is the starting state.
    pub round: i32,
    /// Active agents.
    pub alive: i32,
    /// Eliminated or ejected agents.
    pub dead: i32,
}

/// A row of `final_stats`.
#[derive(Debug, Clone, sqlx::FromRow)]
#[allow(missing_docs)]
pub struct FinalStatsRow {
    pub game_id: Uuid,
    pub agent_id: i32,
    pub role: String,
    pub won: bool,
    pub outcome: String,
    pub votes_received: i32,
    pub correct_votes: i32,
    pub incorrect_votes: i32,
    pub skipped_votes: i32,
    pub emergency_meetings: i32,
    pub bodies_reported: i32,
    pub rounds_survived: i32,
    pub eliminations: i32,
    pub times_eliminated: i32,
    pub ejections: i32,
    pub moves: i32,
    pub degraded_decisions: i32,
}
