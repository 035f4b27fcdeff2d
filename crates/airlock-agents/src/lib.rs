//! Agent records, roster setup and action legality for the Airlock
//! simulation.
//!
//! # Modules
//!
//! - [`error`] -- Error types for agent operations.
//! - [`record`] -- [`AgentRecord`] with guarded status transitions.
//! - [`store`] -- [`AgentStore`], all records of a game in canonical order.
//! - [`roster`] -- Seeded game setup (roles, models, rooms, tasks).
//! - [`validation`] -- Legality checks for movement-phase actions.

pub mod error;
pub mod record;
pub mod roster;
pub mod store;
pub mod validation;

pub use error::AgentError;
pub use record::AgentRecord;
pub use roster::{
    DEFAULT_BYZANTINE_EXCLUDED_PREFIXES, DEFAULT_DISPLAY_TAGS, DEFAULT_MODELS, RosterPlan,
    seat_roster,
};
pub use store::AgentStore;
pub use validation::ValidationContext;
