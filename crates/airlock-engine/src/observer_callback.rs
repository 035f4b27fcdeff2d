//! Phase observer that feeds the Observer API.

use std::sync::Arc;

use airlock_core::snapshot::PhaseObserver;
use airlock_observer::AppState;
use airlock_types::ObserverSnapshot;
use tracing::debug;

/// Publishes every snapshot to the Observer's shared state.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a callback backed by `state`.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl PhaseObserver for ObserverCallback {
    fn on_phase(&mut self, snapshot: &ObserverSnapshot) {
        let receivers = self.state.publish(snapshot.clone());
        debug!(
            round = snapshot.round,
            phase = %snapshot.phase,
            receivers,
            "phase published"
        );
    }
}
