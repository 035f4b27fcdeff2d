//! Win-condition evaluation.
//!
//! Pure functions of the agent store. Lose is checked before Win, so a
//! store with no active agents at all evaluates to Lose.

use airlock_agents::AgentStore;
use airlock_types::{Outcome, Role};

/// Evaluate the outcome after a status-changing event.
pub fn evaluate(agents: &AgentStore) -> Outcome {
    let byzantine = agents.count_active_role(Role::Byzantine);
    let honest = agents.count_active_role(Role::Honest);
    if byzantine >= honest {
        Outcome::Lose
    } else if byzantine == 0 {
        Outcome::Win
    } else {
        Outcome::Undecided
    }
}

/// Evaluate the outcome once the round limit is reached: surviving with the
/// Byzantine agents still outnumbered is a win.
pub fn evaluate_at_limit(agents: &AgentStore) -> Outcome {
    match evaluate(agents) {
        Outcome::Undecided => Outcome::Win,
        decided => decided,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use airlock_agents::AgentRecord;
    use airlock_types::{AgentId, RoomId};

    use super::*;

    /// `byzantine` Byzantine then `honest` honest agents, then remove the
    /// first `gone_byz` Byzantine and `gone_honest` honest.
    fn store(byzantine: u32, honest: u32, gone_byz: u32, gone_honest: u32) -> AgentStore {
        let mut records = Vec::new();
        for i in 0..byzantine {
            let mut r = AgentRecord::new(
                AgentId::new(i + 1),
                Role::Byzantine,
                "m",
                "t",
                RoomId::from("A"),
                None,
            );
            if i < gone_byz {
                r.eject().unwrap();
            }
            records.push(r);
        }
        for i in 0..honest {
            let mut r = AgentRecord::new(
                AgentId::new(byzantine + i + 1),
                Role::Honest,
                "m",
                "t",
                RoomId::from("A"),
                None,
            );

            if i < gone_honest {
                r.eliminate().unwrap();
            }
            records.push(r);
        }
        AgentStore::from_records(records).unwrap()
    }

    #[test]
    fn undecided_while_outnumbered() {
        assert_eq!(evaluate(&store(2, 6, 0, 0)), Outcome::Undecided);
        assert_eq!(evaluate(&store(2, 6, 1, 0)), Outcome::Undecided);
    }

    #[test]
    fn lose_at_parity() {
        assert_eq!(evaluate(&store(2, 6, 0, 4)), Outcome::Lose);
        assert_eq!(evaluate(&store(2, 6, 0, 5)), Outcome::Lose);
        assert_eq!(evaluate(&store(2, 6, 1, 5)), Outcome::Lose);
    }

    #[test]
    fn win_when_no_byzantine_remain() {
        assert_eq!(evaluate(&store(2, 6, 2, 3)), Outcome::Win);
    }

    #[test]
    fn empty_board_is_a_loss() {
        assert_eq!(evaluate(&store(1, 1, 1, 1)), Outcome::Lose);
    }

    #[test]
    fn round_limit_resolves_passively() {
        assert_eq!(evaluate_at_limit(&store(2, 6, 0, 2)), Outcome::Win);
        assert_eq!(evaluate_at_limit(&store(2, 6, 0, 4)), Outcome::Lose);
    }

    #[test]
    fn lose_iff_byzantine_at_least_honest() {
        for byz in 0..4 {
            for honest in 0..6 {
                let s = store(byz, honest, 0, 0);
                let outcome = evaluate(&s);
                assert_eq!(outcome == Outcome::Lose, byz >= honest);
                assert_eq!(outcome == Outcome::Win, byz == 0 && honest > 0);
            }
        }
    }
}
