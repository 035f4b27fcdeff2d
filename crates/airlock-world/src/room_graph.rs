//! The room graph: named rooms as nodes, undirected connections as edges.
//!
//! A [`RoomGraph`] is immutable once built. [`RoomGraph::from_edges`] is the
//! only constructor and rejects maps that are not connected, so every later
//! query can assume any room reaches any other.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use airlock_types::RoomId;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// A serializable description of a map, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Room names.
    pub rooms: Vec<String>,
    /// Undirected connections as `[a, b]` pairs.
    pub connections: Vec<(String, String)>,
    /// Room holding the meeting button.
    pub meeting_room: String,
}

/// Static adjacency over named rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomGraph {
    /// Neighbor sets keyed by room.
    adjacency: BTreeMap<RoomId, BTreeSet<RoomId>>,
    /// Room holding the meeting button.
    meeting_room: RoomId,
}

impl RoomGraph {
    /// Build a graph from room names and undirected connections.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the map is empty, declares a room twice,
    /// references an unknown room, contains a self-loop, lacks the meeting
    /// room, or is not connected.
    pub fn from_edges<R, E>(rooms: R, edges: E, meeting_room: RoomId) -> Result<Self, WorldError>
    where
        R: IntoIterator<Item = RoomId>,
        E: IntoIterator<Item = (RoomId, RoomId)>,
    {
        let mut adjacency: BTreeMap<RoomId, BTreeSet<RoomId>> = BTreeMap::new();
        for room in rooms {
            if adjacency.contains_key(&room) {
                return Err(WorldError::DuplicateRoom(room));
            }
            adjacency.insert(room, BTreeSet::new());
        }
        if adjacency.is_empty() {
            return Err(WorldError::Empty);
        }

        for (a, b) in edges {
            if a == b {
                return Err(WorldError::SelfLoop(a));
            }
            if !adjacency.contains_key(&b) {
                return Err(WorldError::UnknownRoom(b));
            }
            adjacency
                .get_mut(&a)
                .ok_or_else(|| WorldError::UnknownRoom(a.clone()))?
                .insert(b.clone());
            if let Some(back) = adjacency.get_mut(&b) {
                back.insert(a);
            }
        }

        if !adjacency.contains_key(&meeting_room) {
            return Err(WorldError::MeetingRoomMissing(meeting_room));
        }

        let graph = Self {
            adjacency,
            meeting_room,
        };
        graph.check_connected()?;
        tracing::debug!(
            rooms = graph.room_count(),
            meeting_room = %graph.meeting_room,
            "room graph built"
        );
        Ok(graph)
    }

    /// Build a graph from a configuration definition.
    ///
    /// # Errors
    ///
    /// Same as [`RoomGraph::from_edges`].
    pub fn from_definition(def: &MapDefinition) -> Result<Self, WorldError> {
        Self::from_edges(
            def.rooms.iter().map(|r| RoomId::new(r.as_str())),
            def.connections
                .iter()
                .map(|(a, b)| (RoomId::new(a.as_str()), RoomId::new(b.as_str()))),
            RoomId::new(def.meeting_room.as_str()),
        )
    }

    /// Neighbors of a room in name order. Empty for unknown rooms.
    pub fn neighbors(&self, room: &RoomId) -> impl Iterator<Item = &RoomId> {
        self.adjacency.get(room).into_iter().flatten()
    }

    /// Returns `true` if `a` and `b` are directly connected.
    pub fn is_adjacent(&self, a: &RoomId, b: &RoomId) -> bool {
        self.adjacency.get(a).is_some_and(|set| set.contains(b))
    }

    /// Returns `true` if the room is on the map.
    pub fn contains(&self, room: &RoomId) -> bool {
        self.adjacency.contains_key(room)
    }

    /// All rooms in name order.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.adjacency.keys()
    }

    /// Number of rooms.
    pub fn room_count(&self) -> usize {
        self.adjacency.len()
    }

    /// The room holding the meeting button.
    pub const fn meeting_room(&self) -> &RoomId {
        &self.meeting_room
    }

    /// Look up a room by name, ignoring ASCII case.
    pub fn find_room(&self, name: &str) -> Option<&RoomId> {
        let name = name.trim();
        self.adjacency
            .keys()
            .find(|room| room.as_str().eq_ignore_ascii_case(name))
    }

    /// Shortest path from `from` to `to`, excluding `from` and including
    /// `to`. Empty when `from == to`; `None` for unknown rooms.
    pub fn shortest_path(&self, from: &RoomId, to: &RoomId) -> Option<Vec<RoomId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut previous: BTreeMap<&RoomId, &RoomId> = BTreeMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = BTreeSet::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                break;
            }
            for next in self.neighbors(current) {
                if seen.insert(next) {
                    previous.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        let mut path = Vec::new();
        let mut cursor = to;
        while cursor != from {
            path.push(cursor.clone());
            cursor = *previous.get(cursor)?;
        }
        path.reverse();
        Some(path)
    }

    fn check_connected(&self) -> Result<(), WorldError> {
        let Some(start) = self.adjacency.keys().next() else {
            return Err(WorldError::Empty);
        };
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        let unreachable: Vec<RoomId> = self
            .adjacency
            .keys()
            .filter(|room| !seen.contains(room))
            .cloned()
            .collect();
        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(WorldError::Disconnected {
                from: start.clone(),
                unreachable,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn room(name: &str) -> RoomId {
        RoomId::new(name)
    }

    fn triangle() -> RoomGraph {
        RoomGraph::from_edges(
            [room("A"), room("B"), room("C")],
            [(room("A"), room("B")), (room("B"), room("C"))],
            room("A"),
        )
        .unwrap()
    }

    #[test]
    fn connections_are_undirected() {
        let graph = triangle();
        assert!(graph.is_adjacent(&room("A"), &room("B")));
        assert!(graph.is_adjacent(&room("B"), &room("A")));
        assert!(!graph.is_adjacent(&room("A"), &room("C")));
        let around_b: Vec<_> = graph.neighbors(&room("B")).cloned().collect();
        assert_eq!(around_b, vec![room("A"), room("C")]);
    }

    #[test]
    fn unknown_room_has_no_neighbors() {
        let graph = triangle();
        assert_eq!(graph.neighbors(&room("Z")).count(), 0);
    }

    #[test]
    fn rejects_disconnected_map() {
        let result = RoomGraph::from_edges(
            [room("A"), room("B"), room("C")],
            [(room("A"), room("B"))],
            room("A"),
        );
        assert!(matches!(
            result,
            Err(WorldError::Disconnected { ref unreachable, .. }) if unreachable == &vec![room("C")]
        ));
    }

    #[test]
    fn rejects_unknown_endpoint() {
        let result = RoomGraph::from_edges([room("A")], [(room("A"), room("Q"))], room("A"));
        assert!(matches!(result, Err(WorldError::UnknownRoom(r)) if r == room("Q")));
    }

    #[test]
    fn rejects_missing_meeting_room() {
        let result = RoomGraph::from_edges([room("A")], [], room("Cafeteria"));
        assert!(matches!(result, Err(WorldError::MeetingRoomMissing(_))));
    }

    #[test]
    fn rejects_duplicates_and_self_loops() {
        assert!(matches!(
            RoomGraph::from_edges([room("A"), room("A")], [], room("A")),
            Err(WorldError::DuplicateRoom(_))
        ));
        assert!(matches!(
            RoomGraph::from_edges([room("A")], [(room("A"), room("A"))], room("A")),
            Err(WorldError::SelfLoop(_))
        ));
        assert!(matches!(
            RoomGraph::from_edges(Vec::<RoomId>::new(), [], room("A")),
            Err(WorldError::Empty)
        ));
    }

    #[test]
    fn shortest_path_walks_the_chain() {
        let graph = triangle();
        assert_eq!(
            graph.shortest_path(&room("A"), &room("C")).unwrap(),
            vec![room("B"), room("C")]
        );
        assert!(graph.shortest_path(&room("A"), &room("A")).unwrap().is_empty());
        assert!(graph.shortest_path(&room("A"), &room("Z")).is_none());
    }

    #[test]
    fn find_room_ignores_case() {
        let graph = triangle();
        assert_eq!(graph.find_room(" b "), Some(&room("B")));
        assert_eq!(graph.find_room("D"), None);
    }

    #[test]
    fn definition_deserializes_from_json() {
        let json = r#"{"rooms":["A","B"],"connections":[["A","B"]],"meeting_room":"B"}"#;
        let def: MapDefinition = serde_json::from_str(json).unwrap();
        let graph = RoomGraph::from_definition(&def).unwrap();
        assert_eq!(graph.meeting_room(), &room("B"));
        assert_eq!(graph.room_count(), 2);
    }
}
