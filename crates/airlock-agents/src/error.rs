//! Error types for the airlock-agents crate.
//!
//! All operations that can fail return typed errors rather than panicking.

use airlock_types::{AgentId, AgentStatus};

/// Errors that can occur during agent record operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Agent with the given ID was not found in the store.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A status change that would leave the `Active` state twice, or
    /// revive an agent.
    #[error("illegal status transition for {agent}: {from} -> {to}")]
    IllegalTransition {
        /// The agent.
        agent: AgentId,
        /// Current status.
        from: AgentStatus,
        /// Requested status.
        to: AgentStatus,
    },

    /// The roster asks for a degenerate team split.
    #[error("invalid team split: {byzantine} byzantine of {total} agents")]
    InvalidTeamSplit {
        /// Requested Byzantine agents.
        byzantine: u32,
        /// Requested total agents.
        total: u32,
    },

    /// Too few seats may take the Byzantine role after model exclusions.
    #[error("only {eligible} seats may be byzantine, {requested} requested")]
    NotEnoughEligible {
        /// Seats whose model is not excluded.
        eligible: usize,
        /// Requested Byzantine agents.
        requested: u32,
    },

    /// No model tags were configured.
    #[error("roster has no models to assign")]
    NoModels,

    /// Two records share the same identifier.
    #[error("duplicate agent id: {0}")]
    DuplicateAgent(AgentId),
}
