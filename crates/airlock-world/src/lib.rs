//! Geography for the Airlock simulation.
//!
//! # Modules
//!
//! - [`error`] -- Error types for room-graph construction.
//! - [`room_graph`] -- [`RoomGraph`], the immutable, connected adjacency
//!   structure over named rooms, and its configuration form.
//! - [`ship`] -- The default 14-room ship map.

pub mod error;
pub mod room_graph;
pub mod ship;

pub use error::WorldError;
pub use room_graph::{MapDefinition, RoomGraph};
pub use ship::{SHIP_MEETING_ROOM, ship_definition, ship_graph};
