//! Game setup: seats, roles, models, starting rooms and tasks.
//!
//! All randomness comes from the caller's RNG so a seeded generator yields a
//! reproducible roster.

use airlock_types::{AgentId, Role, RoomId};
use airlock_world::RoomGraph;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::error::AgentError;
use crate::record::AgentRecord;
use crate::store::AgentStore;

/// Model tags assigned when the configuration names none.
pub const DEFAULT_MODELS: [&str; 8] = [
    "gpt-4o",
    "gpt-4",
    "claude-3-opus-20240229",
    "claude-3-haiku-20240307",
    "gpt-4-turbo",
    "gemini-1.5-pro",
    "gpt-4-turbo",
    "gpt-4",
];

/// Display tags cycled over seats.
pub const DEFAULT_DISPLAY_TAGS: [&str; 8] = ["🔴", "🔵", "🟢", "💗", "🟠", "🟡", "⚫", "⚪"];

/// Model prefixes that never get the Byzantine role unless configured otherwise.
pub const DEFAULT_BYZANTINE_EXCLUDED_PREFIXES: [&str; 1] = ["claude"];

/// How to seat a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPlan {
    /// Total agents.
    pub agent_count: u32,
    /// Agents given the Byzantine role.
    pub byzantine_count: u32,
    /// Model tags, cycled over seats.
    pub models: Vec<String>,
    /// Display tags, cycled over seats.
    pub display_tags: Vec<String>,
    /// Shuffle model assignment before seating.
    pub shuffle_models: bool,
    /// Give every seat this model instead.
    pub single_model: Option<String>,
    /// Seats whose model starts with one of these never turn Byzantine.
    pub byzantine_excluded_prefixes: Vec<String>,
}

impl Default for RosterPlan {
    fn default() -> Self {
        Self {
            agent_count: 8,
            byzantine_count: 2,
            models: DEFAULT_MODELS.iter().map(|m| (*m).to_owned()).collect(),
            display_tags: DEFAULT_DISPLAY_TAGS.iter().map(|t| (*t).to_owned()).collect(),
            shuffle_models: true,
            single_model: None,
            byzantine_excluded_prefixes: DEFAULT_BYZANTINE_EXCLUDED_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

impl RosterPlan {
    /// Check the team split: at least one Byzantine, strictly fewer
    /// Byzantine than honest agents.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidTeamSplit`].
    pub const fn check_split(&self) -> Result<(), AgentError> {
        let honest = self.agent_count.saturating_sub(self.byzantine_count);
        if self.byzantine_count == 0 || self.byzantine_count >= honest {
            return Err(AgentError::InvalidTeamSplit {
                byzantine: self.byzantine_count,
                total: self.agent_count,
            });
        }
        Ok(())
    }
}

/// Seat a game: assign models, pick Byzantine seats, place agents in random
/// rooms and give honest agents a random task room.
///
/// # Errors
///
/// Returns [`AgentError`] if the split is invalid, no models are configured,
/// or too few seats are eligible for the Byzantine role.
pub fn seat_roster<R: Rng + ?Sized>(
    plan: &RosterPlan,
    graph: &RoomGraph,
    rng: &mut R,
) -> Result<AgentStore, AgentError> {
    plan.check_split()?;

    let mut models: Vec<String> = match &plan.single_model {
        Some(model) => (0..plan.agent_count).map(|_| model.clone()).collect(),
        None => {
            if plan.models.is_empty() {
                return Err(AgentError::NoModels);
            }
            plan.models
                .iter()
                .cycle()
                .take(to_len(plan.agent_count))
                .cloned()
                .collect()
        }
    };
    if plan.shuffle_models && plan.single_model.is_none() {
        models.shuffle(rng);
    }

    let eligible: Vec<usize> = models
        .iter()
        .enumerate()
        .filter(|(_, model)| {
            !plan
                .byzantine_excluded_prefixes
                .iter()
                .any(|prefix| model.starts_with(prefix.as_str()))
        })
        .map(|(seat, _)| seat)
        .collect();
    let wanted = to_len(plan.byzantine_count);
    if eligible.len() < wanted {
        return Err(AgentError::NotEnoughEligible {
            eligible: eligible.len(),
            requested: plan.byzantine_count,
        });
    }
    let byzantine_seats: Vec<usize> = eligible.choose_multiple(rng, wanted).copied().collect();

    let rooms: Vec<RoomId> = graph.rooms().cloned().collect();
    let fallback = graph.meeting_room().clone();
    let mut records = Vec::with_capacity(models.len());
    for ((seat, model), index) in models.into_iter().enumerate().zip(1_u32..) {
        let role = if byzantine_seats.contains(&seat) {
            Role::Byzantine
        } else {
            Role::Honest
        };
        let display_tag = if plan.display_tags.is_empty() {
            String::new()
        } else {
            plan.display_tags
                .iter()
                .cycle()
                .nth(seat)
                .cloned()
                .unwrap_or_default()
        };
        let room = rooms.choose(rng).cloned().unwrap_or_else(|| fallback.clone());
        let task_room = match role {
            Role::Honest => rooms.choose(rng).cloned(),
            Role::Byzantine => None,
        };
        tracing::debug!(agent = %AgentId::new(index), %role, %model, %room, "seated agent");
        records.push(AgentRecord::new(
            AgentId::new(index),
            role,
            model,
            display_tag,
            room,
            task_room,
        ));
    }

    AgentStore::from_records(records)
}

fn to_len(count: u32) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_world::ship_graph;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn seats_eight_with_two_byzantine() {
        let graph = ship_graph().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let store = seat_roster(&RosterPlan::default(), &graph, &mut rng).unwrap();
        assert_eq!(store.len(), 8);
        assert_eq!(store.count_active_role(Role::Byzantine), 2);
        assert_eq!(store.get(AgentId::new(1)).unwrap().id.to_string(), "Agent_1");
        for record in store.iter() {
            assert!(graph.contains(&record.room));
            assert_eq!(record.task_room.is_some(), !record.is_byzantine());
        }
    }

    #[test]
    fn same_seed_same_roster() {
        let graph = ship_graph().unwrap();
        let plan = RosterPlan::default();
        let a = seat_roster(&plan, &graph, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = seat_roster(&plan, &graph, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn default_plan_never_seats_claude_as_byzantine() {
        let graph = ship_graph().unwrap();
        let plan = RosterPlan::default();
        assert_eq!(plan.byzantine_excluded_prefixes, vec!["claude".to_owned()]);
        for seed in 0..20 {
            let store = seat_roster(&plan, &graph, &mut StdRng::seed_from_u64(seed)).unwrap();
            for record in store.iter().filter(|r| r.is_byzantine()) {
                assert!(!record.model_tag.starts_with("claude"));
            }
        }
    }

    #[test]
    fn empty_exclusion_list_lets_any_model_turn_byzantine() {
        let graph = ship_graph().unwrap();
        let plan = RosterPlan {
            single_model: Some("claude-3-opus".to_owned()),
            byzantine_excluded_prefixes: Vec::new(),
            ..RosterPlan::default()
        };
        let store = seat_roster(&plan, &graph, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(store.count_active_role(Role::Byzantine), 2);
    }

    #[test]
    fn single_model_overrides_list() {
        let graph = ship_graph().unwrap();
        let plan = RosterPlan {
            single_model: Some("gpt-4o".to_owned()),
            ..RosterPlan::default()
        };
        let store = seat_roster(&plan, &graph, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(store.iter().all(|r| r.model_tag == "gpt-4o"));
    }

    #[test]
    fn rejects_degenerate_splits() {
        let graph = ship_graph().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for (byzantine, total) in [(0, 8), (4, 8), (5, 8)] {
            let plan = RosterPlan {
                agent_count: total,
                byzantine_count: byzantine,
                ..RosterPlan::default()
            };
            assert!(matches!(
                seat_roster(&plan, &graph, &mut rng),
                Err(AgentError::InvalidTeamSplit { .. })
            ));
        }
    }

    #[test]
    fn too_few_eligible_seats() {
        let graph = ship_graph().unwrap();
        let plan = RosterPlan {
            single_model: Some("claude-3-opus".to_owned()),
            byzantine_excluded_prefixes: vec!["claude".to_owned()],
            ..RosterPlan::default()
        };
        assert!(matches!(
            seat_roster(&plan, &graph, &mut StdRng::seed_from_u64(0)),
            Err(AgentError::NotEnoughEligible { eligible: 0, .. })
        ));
    }
}
