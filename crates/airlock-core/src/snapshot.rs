//! Observer snapshots and the recent-event feed.
//!
//! The scheduler builds an [`ObserverSnapshot`] after every phase change and
//! hands it to a [`PhaseObserver`]. Feed messages describe what any agent in
//! the room could have seen: a body in a room, a meeting, a vote. They never
//! name an eliminator.

use std::collections::VecDeque;

use airlock_types::{
    AgentSnapshot, Body, FeedEntry, FeedKind, ObserverSnapshot, Outcome, ResultsEntry,
    RoomSnapshot,
};
use airlock_world::RoomGraph;
use chrono::Utc;

use crate::movement::Trigger;
use crate::state::GameState;

/// Bounded feed of recent events; the oldest entry is dropped first.
#[derive(Debug, Clone)]
pub struct EventFeed {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl EventFeed {
    /// Create an empty feed holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push one entry, evicting the oldest if full.
    pub fn push(&mut self, round: u32, kind: FeedKind, message: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(FeedEntry {
            at: Utc::now(),
            round,
            kind,
            message: message.into(),
        });
    }

    /// A body was found in a room.
    pub fn body(&mut self, round: u32, body: &Body) {
        self.push(
            round,
            FeedKind::Elimination,
            format!("{} was eliminated in {}", body.deceased, body.room),
        );
    }

    /// A meeting was called.
    pub fn meeting(&mut self, round: u32, trigger: &Trigger) {
        self.push(
            round,
            FeedKind::Meeting,
            format!("{} called a meeting ({})", trigger.caller, trigger.cause),
        );
    }

    /// A meeting resolved.
    pub fn vote(&mut self, results: &ResultsEntry) {
        let message = match results.ejected {
            Some(id) => format!("{id} was ejected ({} skipped)", results.skips),
            None => format!("No one was ejected ({} skipped)", results.skips),
        };
        self.push(results.round, FeedKind::Vote, message);
    }

    /// The game ended.
    pub fn outcome(&mut self, round: u32, outcome: Outcome) {
        let message = match outcome {
            Outcome::Win => "Honest agents win",
            Outcome::Lose => "Byzantine agents win",
            Outcome::Undecided => "Game ended undecided",
        };
        self.push(round, FeedKind::Outcome, message);
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Project `state` for observers.
pub fn build_snapshot(state: &GameState, graph: &RoomGraph, feed: &EventFeed) -> ObserverSnapshot {
    let rooms = graph
        .rooms()
        .map(|room| RoomSnapshot {
            room: room.clone(),
            occupants: state.agents.active_in(room),
            bodies: state
                .bodies
                .iter()
                .filter(|b| &b.room == room)
                .map(|b| b.deceased)
                .collect(),
        })
        .collect();
    let agents = state
        .agents
        .iter()
        .map(|r| AgentSnapshot {
            id: r.id,
            display_tag: r.display_tag.clone(),
            model_tag: r.model_tag.clone(),
            role: r.role(),
            status: r.status(),
            room: r.room.clone(),
            votes_received: r.votes_received,
        })
        .collect();
    ObserverSnapshot {
        game_id: state.game_id,
        round: state.round,
        sub_step: state.sub_step,
        phase: state.phase(),
        outcome: state.outcome,
        rooms,
        agents,
        feed: feed.entries().cloned().collect(),
    }
}

/// Receives a snapshot after every phase change.
pub trait PhaseObserver: Send {
    /// Called with the fresh snapshot.
    fn on_phase(&mut self, snapshot: &ObserverSnapshot);
}

/// An observer that ignores every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl PhaseObserver for NoOpObserver {
    fn on_phase(&mut self, _snapshot: &ObserverSnapshot) {}
}
