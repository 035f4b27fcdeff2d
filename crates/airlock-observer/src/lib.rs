//! Observer API server for the Airlock simulation.
//!
//! - **REST endpoints** for the latest game snapshot: agents, rooms and the
//!   recent-event feed
//! - **`WebSocket` endpoint** (`/ws/phases`) streaming a summary of every
//!   phase change via [`tokio::sync::broadcast`]
//! - **HTML status page** (`GET /`)
//!
//! The engine publishes snapshots through [`AppState::publish`]; nothing in
//! the game waits on a reader.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, spawn_observer, start_server};
pub use state::{AppState, PhaseBroadcast};
