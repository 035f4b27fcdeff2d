//! Shared stop signal for a running game.
//!
//! [`GameControl`] is wrapped in an [`Arc`](std::sync::Arc) and shared
//! between the scheduler and whoever may abort the run (the binary's Ctrl-C
//! handler, tests). The flag is an atomic so the scheduler can poll it
//! between phases without locking; the [`Notify`] wakes an in-flight
//! decision gather so it can abort its tasks.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Stop control shared with the scheduler.
#[derive(Debug, Default)]
pub struct GameControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,
    /// Wakes tasks waiting in [`GameControl::stopped`].
    stop_notify: Notify,
}

impl GameControl {
    /// Create a control with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake every waiter.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        loop {
            // Created before the check so a concurrent notify_waiters is not lost.
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }
}
