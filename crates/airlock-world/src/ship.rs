//! Default ship map.
//!
//! Fourteen rooms in three clusters (engines aft, crew quarters midships,
//! systems forward) joined by 25 corridors. The meeting button sits in the
//! Cafeteria.

use airlock_types::RoomId;

use crate::error::WorldError;
use crate::room_graph::{MapDefinition, RoomGraph};

/// Room names of the default ship.
pub const SHIP_ROOMS: [&str; 14] = [
    "Reactor",
    "UpperEngine",
    "LowerEngine",
    "Security",
    "MedBay",
    "Electrical",
    "Cafeteria",
    "Admin",
    "Storage",
    "Weapons",
    "O2",
    "Navigation",
    "Shields",
    "Communications",
];

/// Corridors of the default ship.
pub const SHIP_CONNECTIONS: [(&str, &str); 25] = [
    // Engines
    ("Reactor", "UpperEngine"),
    ("Reactor", "LowerEngine"),
    ("Reactor", "Security"),
    ("Security", "UpperEngine"),
    ("Security", "LowerEngine"),
    ("UpperEngine", "LowerEngine"),
    // Crew quarters
    ("UpperEngine", "MedBay"),
    ("UpperEngine", "Cafeteria"),
    ("MedBay", "Cafeteria"),
    ("LowerEngine", "Electrical"),
    ("LowerEngine", "Storage"),
    ("Electrical", "Storage"),
    ("Cafeteria", "Admin"),
    ("Cafeteria", "Storage"),
    ("Admin", "Storage"),
    // Systems
    ("Cafeteria", "Weapons"),
    ("Weapons", "O2"),
    ("Weapons", "Navigation"),
    ("Weapons", "Shields"),
    ("O2", "Navigation"),
    ("O2", "Shields"),
    ("Navigation", "Shields"),
    ("Storage", "Shields"),
    ("Storage", "Communications"),
    ("Shields", "Communications"),
];

/// The room holding the meeting button on the default ship.
pub const SHIP_MEETING_ROOM: &str = "Cafeteria";

/// Build the default ship graph.
///
/// # Errors
///
/// Never fails for the built-in tables; the `Result` mirrors
/// [`RoomGraph::from_edges`].
pub fn ship_graph() -> Result<RoomGraph, WorldError> {
    RoomGraph::from_edges(
        SHIP_ROOMS.iter().map(|name| RoomId::from(*name)),
        SHIP_CONNECTIONS
            .iter()
            .map(|(a, b)| (RoomId::from(*a), RoomId::from(*b))),
        RoomId::from(SHIP_MEETING_ROOM),
    )
}

/// The default ship as a configuration definition.
pub fn ship_definition() -> MapDefinition {
    MapDefinition {
        rooms: SHIP_ROOMS.iter().map(|name| (*name).to_owned()).collect(),
        connections: SHIP_CONNECTIONS
            .iter()
            .map(|(a, b)| ((*a).to_owned(), (*b).to_owned()))
            .collect(),
        meeting_room: SHIP_MEETING_ROOM.to_owned(),
    }
}
