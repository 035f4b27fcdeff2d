//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every subsystem failure so the setup and game
//! functions can propagate with `?`; `main` reports it through `anyhow`.

use airlock_agents::AgentError;
use airlock_core::config::ConfigError;
use airlock_core::scheduler::SchedulerError;
use airlock_db::DbError;
use airlock_observer::ServerError;
use airlock_runner::error::RunnerError;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Seating a roster failed.
    #[error("roster error: {source}")]
    Roster {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// The LLM runner could not be set up.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: RunnerError,
    },

    /// The database could not be reached or migrated.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// The Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },

    /// A game ended with an error.
    #[error("game error: {source}")]
    Game {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },
}
