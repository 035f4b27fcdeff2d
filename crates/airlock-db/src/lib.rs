//! `PostgreSQL` persistence for Airlock game logs.
//!
//! ```text
//! Scheduler --append--> PostgresSink --channel--> writer task --> LogStore
//!                                                                  |-- agents
//!                                                                  |-- action_log
//!                                                                  |-- discussion_log
//!                                                                  |-- results_log
//!                                                                  |-- round_counts
//!                                                                  +-- final_stats
//! ```
//!
//! - [`postgres`] -- connection pool and migrations
//! - [`log_store`] -- inserts and round-range queries
//! - [`sink`] -- the [`airlock_core::sink::LogSink`] implementation
//! - [`error`] -- shared error type

pub mod error;
pub mod log_store;
pub mod postgres;
pub mod sink;

pub use error::DbError;
pub use log_store::{
    ActionRow, AgentRow, DiscussionRow, FinalStatsRow, LogStore, ResultsRow, RoundCountRow,
};

pub use postgres::{PostgresConfig, PostgresPool};
pub use sink::{PostgresSink, SinkWriter, WriterReport};
