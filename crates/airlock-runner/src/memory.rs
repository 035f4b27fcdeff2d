//! Agent memory as a query over the log store.
//!
//! Nothing is cached per agent. Every prompt re-reads the round-indexed
//! [`MemoryLogStore`] and renders what the agent is entitled to recall:
//! its own actions this round, what was said in this round's meeting, and
//! every published meeting result. A store with no records for the game
//! yields empty memory.

use airlock_core::sink::MemoryLogStore;
use airlock_types::{ActionEntry, ActionOutcome, AgentId, GameId, MovementAction, ResultsEntry};

/// Read-only view of one game's records for prompt rendering.
#[derive(Debug, Clone, Copy)]
pub struct AgentMemory<'a> {
    store: &'a MemoryLogStore,
    game_id: GameId,
}

impl<'a> AgentMemory<'a> {
    /// Memory over `store` for `game_id`.
    pub const fn new(store: &'a MemoryLogStore, game_id: GameId) -> Self {
        Self { store, game_id }
    }

    /// One line per sub-step `agent` resolved in `round`.
    pub fn own_actions(&self, agent: AgentId, round: u32) -> Vec<String> {
        self.store
            .actions(self.game_id, Some(agent), round..=round)
            .iter()
            .map(describe_action)
            .collect()
    }

    /// Every non-empty utterance of the meeting held in `round`.
    pub fn discussion(&self, round: u32) -> Vec<String> {
        self.store
            .discussion(self.game_id, round..=round)
            .into_iter()
            .filter(|entry| !entry.degraded && !entry.text.trim().is_empty())
            .map(|entry| format!("{}: {}", entry.agent_id, entry.text))
            .collect()
    }

    /// A summary line for every meeting resolved up to `round`.
    pub fn results(&self, round: u32) -> Vec<String> {
        self.store
            .results(self.game_id, 0..=round)
            .iter()
            .map(describe_result)
            .collect()
    }
}

fn describe_action(entry: &ActionEntry) -> String {
    let step = entry.sub_step.saturating_add(1);
    let did = match (&entry.action, entry.outcome) {
        (MovementAction::Move { .. }, ActionOutcome::Applied)
            if entry.from_room != entry.to_room =>
        {

            format!("moved from {} to {}", entry.from_room, entry.to_room)
        }
        (MovementAction::Eliminate { target }, ActionOutcome::Applied) => {
            format!("eliminated {target} in {}", entry.to_room)
        }
        (MovementAction::Report { body }, ActionOutcome::Applied) => {
            format!("reported the body of {body} in {}", entry.to_room)
        }
        (MovementAction::PressButton, ActionOutcome::Applied) => {
            format!("pressed the button in {}", entry.to_room)
        }
        _ => format!("stayed in {}", entry.to_room),
    };
    let mut line = format!("Sub-step {step}: {did}");
    if !entry.witnessed.is_empty() {
        line.push_str(&format!("; saw {}", join_ids(&entry.witnessed)));
    }
    if !entry.bodies_seen.is_empty() {
        line.push_str(&format!("; found the body of {}", join_ids(&entry.bodies_seen)));
    }
    line
}

fn describe_result(entry: &ResultsEntry) -> String {
    let votes: Vec<String> = entry
        .tally
        .iter()
        .map(|count| format!("{} {}", count.candidate, count.votes))
        .collect();
    let verdict = entry
        .ejected
        .map_or_else(|| "nobody was ejected".to_owned(), |id| format!("{id} was ejected"));
    format!(
        "Round {}: {} called a meeting ({}). Votes: {}{}SKIP {}. {verdict}; {} agents remain.",
        entry.round,
        entry.caller,
        entry.cause,
        votes.join(", "),
        if votes.is_empty() { "" } else { ", " },
        entry.skips,
        entry.remaining_active,
    )
}

fn join_ids(ids: &[AgentId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
