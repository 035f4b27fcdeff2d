//! Round/phase scheduler, meetings, and decision fan-out for the Airlock
//! simulation.
//!
//! This crate owns the state machine that turns many slow, unreliable agent
//! decisions into one consistent world state: Movement sub-steps, then an
//! optional meeting (Discussion and Voting), then Round End, until the win
//! condition ends the game.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `airlock-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- [`GameControl`] stop signal shared with the binary.
//! - [`decision`] -- [`DecisionOracle`] trait and [`ScriptedOracle`].
//! - [`fanout`] -- Concurrent, deadline-bounded decision gathering.
//! - [`meeting`] -- Discussion transcript, ballots and plurality.
//! - [`movement`] -- Deterministic sub-step resolution.
//! - [`perception`] -- Per-agent world views and meeting contexts.
//! - [`scheduler`] -- [`run_game`], the game loop.
//! - [`sink`] -- [`LogSink`] trait and the in-memory record store.
//! - [`snapshot`] -- Observer snapshots and the event feed.
//! - [`state`] -- [`GameState`] and its structural invariants.
//! - [`win`] -- Win-condition evaluation.
//!
//! [`GameControl`]: control::GameControl
//! [`DecisionOracle`]: decision::DecisionOracle
//! [`ScriptedOracle`]: decision::ScriptedOracle
//! [`run_game`]: scheduler::run_game
//! [`LogSink`]: sink::LogSink
//! [`GameState`]: state::GameState

pub mod config;
pub mod control;
pub mod decision;
pub mod fanout;
pub mod meeting;
pub mod movement;
pub mod perception;
pub mod scheduler;
pub mod sink;
pub mod snapshot;
pub mod state;
pub mod win;
