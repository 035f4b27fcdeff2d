//! Shared application state for the Observer API server.
//!
//! The engine publishes one [`ObserverSnapshot`] per phase change. The
//! latest snapshot sits in a `watch` channel so REST handlers read it
//! without ever blocking the publisher, and a compact [`PhaseBroadcast`]
//! goes out on a `broadcast` channel to every `WebSocket` client.

use airlock_types::{AgentStatus, GameId, ObserverSnapshot, Outcome, Phase};
use tokio::sync::{broadcast, watch};
use ts_rs::TS;

/// Capacity of the phase broadcast channel.
///
/// A subscriber that falls further behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips ahead.
const BROADCAST_CAPACITY: usize = 256;

/// JSON message pushed over `/ws/phases` on every phase change.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhaseBroadcast {
    /// Game.
    pub game_id: GameId,
    /// Round number.
    pub round: u32,
    /// Movement sub-step.
    pub sub_step: u32,
    /// Phase entered.
    pub phase: Phase,
    /// Outcome so far.
    pub outcome: Outcome,
    /// Active agents.
    pub active: u32,
    /// Eliminated agents.
    pub eliminated: u32,
    /// Ejected agents.
    pub ejected: u32,
}

impl PhaseBroadcast {
    /// Summarize a snapshot.
    pub fn from_snapshot(snapshot: &ObserverSnapshot) -> Self {
        let count = |status: AgentStatus| {
            let n = snapshot.agents.iter().filter(|a| a.status == status).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        Self {
            game_id: snapshot.game_id,
            round: snapshot.round,
            sub_step: snapshot.sub_step,
            phase: snapshot.phase,
            outcome: snapshot.outcome,
            active: count(AgentStatus::Active),
            eliminated: count(AgentStatus::Eliminated),
            ejected: count(AgentStatus::Ejected),
        }
    }
}

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    tx: broadcast::Sender<PhaseBroadcast>,
    latest: watch::Sender<Option<ObserverSnapshot>>,
}

impl AppState {
    /// State with no snapshot yet.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (latest, _) = watch::channel(None);
        Self { tx, latest }
    }

    /// Subscribe to phase broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<PhaseBroadcast> {
        self.tx.subscribe()
    }

    /// Replace the latest snapshot and notify `WebSocket` clients.
    ///
    /// Returns the number of clients notified; zero is not an error.
    pub fn publish(&self, snapshot: ObserverSnapshot) -> usize {
        let message = PhaseBroadcast::from_snapshot(&snapshot);
        self.latest.send_replace(Some(snapshot));
        // Fails only when nobody is subscribed.
        self.tx.send(message).unwrap_or(0)
    }

    /// A copy of the latest snapshot, if any game has published one.
    pub fn snapshot(&self) -> Option<ObserverSnapshot> {
        self.latest.borrow().clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
