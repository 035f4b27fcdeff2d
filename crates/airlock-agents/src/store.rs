//! The agent record store: every record of one game keyed by identifier.
//!
//! Backed by a `BTreeMap` so iteration is always in canonical agent-index
//! order.

use std::collections::BTreeMap;

use airlock_types::{AgentId, AgentStatus, Role, RoomId};

use crate::error::AgentError;
use crate::record::AgentRecord;

/// All agent records of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStore {
    records: BTreeMap<AgentId, AgentRecord>,
}

impl AgentStore {
    /// Build a store from records.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateAgent`] if two records share an id.
    pub fn from_records(
        records: impl IntoIterator<Item = AgentRecord>,
    ) -> Result<Self, AgentError> {
        let mut map = BTreeMap::new();
        for record in records {
            let id = record.id;
            if map.insert(id, record).is_some() {
                return Err(AgentError::DuplicateAgent(id));
            }
        }
        Ok(Self { records: map })
    }

    /// Look up a record.
    pub fn get(&self, id: AgentId) -> Option<&AgentRecord> {
        self.records.get(&id)
    }

    /// Look up a record mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentRecord> {
        self.records.get_mut(&id)
    }

    /// Look up a record mutably, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`].
    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut AgentRecord, AgentError> {
        self.records.get_mut(&id).ok_or(AgentError::AgentNotFound(id))
    }

    /// All records in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.values()
    }

    /// All records mutably, in canonical order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentRecord> {
        self.records.values_mut()
    }

    /// Active records in canonical order.
    pub fn active(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.values().filter(|r| r.is_active())
    }

    /// Active agent identifiers in canonical order.
    pub fn active_ids(&self) -> Vec<AgentId> {
        self.active().map(|r| r.id).collect()
    }

    /// Active agents in `room` in canonical order.
    pub fn active_in(&self, room: &RoomId) -> Vec<AgentId> {
        self.active()
            .filter(|r| &r.room == room)
            .map(|r| r.id)
            .collect()
    }

    /// Number of agents with `status`.
    pub fn count_status(&self, status: AgentStatus) -> usize {
        self.records.values().filter(|r| r.status() == status).count()
    }

    /// Number of active agents with `role`.
    pub fn count_active_role(&self, role: Role) -> usize {
        self.active().filter(|r| r.role() == role).count()
    }

    /// Byzantine agents, in canonical order, whatever their status.
    pub fn byzantine_ids(&self) -> Vec<AgentId> {
        self.records
            .values()
            .filter(|r| r.is_byzantine())
            .map(|r| r.id)
            .collect()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(index: u32, role: Role, room: &str) -> AgentRecord {
        AgentRecord::new(AgentId::new(index), role, "m", "t", RoomId::from(room), None)
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = AgentStore::from_records([
            agent(1, Role::Honest, "A"),
            agent(1, Role::Byzantine, "B"),
        ]);
        assert!(matches!(result, Err(AgentError::DuplicateAgent(_))));
    }

    #[test]
    fn iterates_in_canonical_order() {
        let store = AgentStore::from_records([
            agent(3, Role::Honest, "A"),
            agent(1, Role::Honest, "A"),
            agent(2, Role::Byzantine, "B"),
        ])
        .unwrap_or_default();
        assert_eq!(
            store.active_ids(),
            vec![AgentId::new(1), AgentId::new(2), AgentId::new(3)]
        );
        assert_eq!(store.active_in(&RoomId::from("A")), vec![AgentId::new(1), AgentId::new(3)]);
        assert_eq!(store.count_active_role(Role::Byzantine), 1);
        assert_eq!(store.byzantine_ids(), vec![AgentId::new(2)]);
    }

    #[test]
    fn counts_follow_status_changes() {
        let mut store = AgentStore::from_records([
            agent(1, Role::Honest, "A"),
            agent(2, Role::Byzantine, "A"),
        ])
        .unwrap_or_default();
        assert!(store.require_mut(AgentId::new(1)).is_ok_and(|r| r.eliminate().is_ok()));
        assert_eq!(store.count_status(AgentStatus::Active), 1);
        assert_eq!(store.count_status(AgentStatus::Eliminated), 1);
        assert!(store.require_mut(AgentId::new(9)).is_err());
    }
}
