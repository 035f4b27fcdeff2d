//! Error types for the `airlock-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use airlock_types::RoomId;

/// Errors raised while building a room graph.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The map has no rooms.
    #[error("map has no rooms")]
    Empty,

    /// A room was declared twice.
    #[error("duplicate room: {0}")]
    DuplicateRoom(RoomId),

    /// A connection names a room that was never declared.
    #[error("connection references unknown room: {0}")]
    UnknownRoom(RoomId),

    /// A room is connected to itself.
    #[error("room {0} is connected to itself")]
    SelfLoop(RoomId),

    /// The designated meeting room is not on the map.
    #[error("meeting room {0} is not on the map")]
    MeetingRoomMissing(RoomId),

    /// Some rooms cannot be reached from the others.
    #[error("map is not connected: {} unreachable from {from}", unreachable.len())]
    Disconnected {
        /// Room the search started from.
        from: RoomId,
        /// Rooms the search never reached.
        unreachable: Vec<RoomId>,
    },
}
