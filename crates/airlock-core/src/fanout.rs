//! Concurrent decision gathering with per-call deadlines.
//!
//! One task per agent is spawned into a [`JoinSet`]; each wraps its oracle
//! call in a timeout. The gather returns once every task has finished, and
//! the results are keyed by [`AgentId`] so the caller applies them in
//! canonical order whatever order they arrived in.
//!
//! A timeout, an oracle error or a panicked task yields the caller's safe
//! default, marked degraded. A stop request aborts every outstanding task
//! and discards the partial results.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use airlock_types::{AgentId, DegradedReason, Phase};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::control::GameControl;
use crate::decision::{DecisionError, DecisionFuture};

/// One gathered decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gathered<T> {
    /// The oracle answered in time.
    Decided(T),
    /// The safe default replaced the oracle's answer.
    Degraded {
        /// The safe default.
        value: T,
        /// What went wrong.
        reason: DegradedReason,
    },
}

impl<T> Gathered<T> {
    /// The value, decided or default.
    pub const fn value(&self) -> &T {
        match self {
            Self::Decided(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Consume into the value.
    pub fn into_value(self) -> T {
        match self {
            Self::Decided(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// The degradation reason, if any.
    pub const fn degraded(&self) -> Option<DegradedReason> {
        match self {
            Self::Decided(_) => None,
            Self::Degraded { reason, .. } => Some(*reason),
        }
    }
}

/// The gather was aborted by a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("decision gather aborted")]
pub struct GatherAborted;

/// What a gather is for, for log fields.
#[derive(Debug, Clone, Copy)]
pub struct GatherLabel {
    /// Phase being gathered.
    pub phase: Phase,
    /// Round.
    pub round: u32,
}

const fn degraded_reason(error: &DecisionError) -> DegradedReason {
    match error {
        DecisionError::Timeout { .. } => DegradedReason::Timeout,
        DecisionError::Failed { .. } => DegradedReason::OracleFailure,
        DecisionError::Unparseable { .. } => DegradedReason::Unparseable,
    }
}

/// Run every call concurrently and collect one result per agent.
///
/// # Errors
///
/// Returns [`GatherAborted`] if `control` requests a stop before every task
/// has finished. Outstanding tasks are aborted.
pub async fn gather<T, F>(
    label: GatherLabel,
    calls: Vec<(AgentId, DecisionFuture<T>)>,
    deadline: Duration,
    fallback: F,
    control: &GameControl,
) -> Result<BTreeMap<AgentId, Gathered<T>>, GatherAborted>
where
    T: Send + 'static,
    F: Fn(AgentId) -> T,
{
    if control.is_stop_requested() {
        return Err(GatherAborted);
    }

    let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
    let mut tasks = JoinSet::new();
    let mut owners = HashMap::new();
    for (agent_id, call) in calls {
        let handle = tasks.spawn(async move {
            match tokio::time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_elapsed) => Err(DecisionError::Timeout {
                    agent_id,
                    deadline_ms,
                }),
            }
        });
        owners.insert(handle.id(), agent_id);
    }

    let mut results = BTreeMap::new();
    loop {
        let joined = tokio::select! {
            biased;
            () = control.stopped() => {
                tasks.abort_all();
                warn!(
                    phase = %label.phase,
                    round = label.round,
                    pending = tasks.len(),
                    "stop requested, discarding phase"
                );
                return Err(GatherAborted);
            }
            joined = tasks.join_next_with_id() => joined,
        };
        let Some(joined) = joined else { break };

        let (task_id, outcome) = match joined {
            Ok((task_id, outcome)) => (task_id, outcome),
            Err(join_error) => {
                let task_id = join_error.id();
                let message = join_error.to_string();
                (task_id, Err(DecisionError::Failed { message }))
            }
        };
        let Some(agent_id) = owners.get(&task_id).copied() else {
            continue;
        };

        let gathered = match outcome {
            Ok(value) => {
                debug!(phase = %label.phase, round = label.round, %agent_id, "decision received");
                Gathered::Decided(value)
            }
            Err(error) => {
                let reason = degraded_reason(&error);
                warn!(
                    phase = %label.phase,
                    round = label.round,
                    %agent_id,
                    %reason,
                    error = %error,
                    "decision degraded, using safe default"
                );
                Gathered::Degraded {
                    value: fallback(agent_id),
                    reason,
                }
            }
        };
        results.insert(agent_id, gathered);
    }

    // Every spawned task reports exactly once; this only fills gaps.
    for agent_id in owners.into_values() {
        results.entry(agent_id).or_insert_with(|| Gathered::Degraded {
            value: fallback(agent_id),
            reason: DegradedReason::OracleFailure,
        });
    }
    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const LABEL: GatherLabel = GatherLabel {
        phase: Phase::Voting,
        round: 1,
    };

    fn answer(value: u32, after: Duration) -> DecisionFuture<u32> {
        Box::pin(async move {
            tokio::time::sleep(after).await;
            Ok(value)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn results_are_keyed_regardless_of_arrival() {
        let control = GameControl::new();
        let calls = vec![
            (AgentId::new(1), answer(10, Duration::from_millis(300))),
            (AgentId::new(2), answer(20, Duration::from_millis(100))),
            (AgentId::new(3), answer(30, Duration::from_millis(200))),
        ];
        let results = gather(LABEL, calls, Duration::from_secs(1), |_| 0, &control)
            .await
            .unwrap();
        let values: Vec<_> = results.iter().map(|(id, g)| (id.index(), *g.value())).collect();
        assert_eq!(values, vec![(1, 10), (2, 20), (3, 30)]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_agent_times_out_to_default() {
        let control = GameControl::new();
        let never: DecisionFuture<u32> = Box::pin(std::future::pending());
        let calls = vec![
            (AgentId::new(1), answer(10, Duration::ZERO)),
            (AgentId::new(7), never),
        ];
        let results = gather(LABEL, calls, Duration::from_secs(5), |_| 99, &control)
            .await
            .unwrap();
        assert_eq!(results.get(&AgentId::new(1)), Some(&Gathered::Decided(10)));
        assert_eq!(
            results.get(&AgentId::new(7)),
            Some(&Gathered::Degraded {
                value: 99,
                reason: DegradedReason::Timeout
            })
        );
    }

    #[tokio::test]
    async fn oracle_errors_degrade() {
        let control = GameControl::new();
        let failing: DecisionFuture<u32> = Box::pin(async {
            Err(DecisionError::Unparseable {
                raw: "dance".to_owned(),
            })
        });
        let calls = vec![(AgentId::new(4), failing)];
        let results = gather(LABEL, calls, Duration::from_secs(1), |_| 0, &control)
            .await
            .unwrap();
        assert_eq!(
            results.get(&AgentId::new(4)).and_then(Gathered::degraded),
            Some(DegradedReason::Unparseable)
        );
    }

    #[tokio::test]
    async fn panicking_task_degrades() {
        let control = GameControl::new();
        let panicking: DecisionFuture<u32> = Box::pin(async {
            let values: Vec<u32> = Vec::new();
            // Out-of-bounds access panics inside the spawned task only.
            #[allow(clippy::indexing_slicing)]
            let value = values[1];
            Ok(value)
        });
        let calls = vec![(AgentId::new(2), panicking)];
        let results = gather(LABEL, calls, Duration::from_secs(1), |_| 5, &control)
            .await
            .unwrap();
        assert_eq!(
            results.get(&AgentId::new(2)),
            Some(&Gathered::Degraded {
                value: 5,
                reason: DegradedReason::OracleFailure
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_the_gather() {
        let control = Arc::new(GameControl::new());
        let stopper = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                control.request_stop();
            })
        };
        let never: DecisionFuture<u32> = Box::pin(std::future::pending());
        let calls = vec![(AgentId::new(1), never)];
        let result = gather(LABEL, calls, Duration::from_secs(60), |_| 0, &control).await;
        assert_eq!(result, Err(GatherAborted));
        stopper.await.unwrap();
    }

    #[tokio::test]
    async fn already_stopped_gathers_nothing() {
        let control = GameControl::new();
        control.request_stop();
        let calls = vec![(AgentId::new(1), answer(1, Duration::ZERO))];
        let result = gather(LABEL, calls, Duration::from_secs(1), |_| 0, &control).await;

        assert_eq!(result, Err(GatherAborted));
    }
}
