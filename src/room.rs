//! Room and room registry definitions
//!
//! A room is a named set of sessions that receive each other's broadcasts.
//! Rooms come into existence on the first join to an unknown name and only
//! go away when merged into another room.

use std::collections::{HashMap, HashSet};

use crate::types::{ClientId, RoomName};

/// Chat room
///
/// Identified by its key in `RoomRegistry`.
#[derive(Debug, Default)]
pub struct Room {
    /// Sessions currently inside
    pub members: HashSet<ClientId>,
}

impl Room {
    /// Create an empty room
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member; returns false if it was already inside
    pub fn add(&mut self, client_id: ClientId) -> bool {
        self.members.insert(client_id)
    }

    /// Remove a member; returns false if it was not inside
    pub fn remove(&mut self, client_id: ClientId) -> bool {
        self.members.remove(&client_id)
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains(&client_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Snapshot of the current membership, for broadcasting
    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.iter().copied().collect()
    }
}

/// All rooms by name
///
/// Lifecycle is explicit: `get_or_create` on join, `remove_merged` on merge.
/// Leaving never deletes a room, even when it becomes empty.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomName, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &RoomName) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn contains(&self, name: &RoomName) -> bool {
        self.rooms.contains_key(name)
    }

    /// Room with the given name, created empty if it does not exist yet
    pub fn get_or_create(&mut self, name: &RoomName) -> &mut Room {
        self.rooms.entry(name.clone()).or_default()
    }

    /// Remove a member from a room; returns false if the room or the
    /// membership did not exist
    pub fn remove_member(&mut self, name: &RoomName, client_id: ClientId) -> bool {
        self.rooms
            .get_mut(name)
            .map(|room| room.remove(client_id))
            .unwrap_or(false)
    }

    /// Members of a room, empty if the room does not exist
    pub fn member_ids(&self, name: &RoomName) -> Vec<ClientId> {
        self.rooms
            .get(name)
            .map(Room::member_ids)
            .unwrap_or_default()
    }

    /// Delete a room that has been merged away, handing back its last state
    pub fn remove_merged(&mut self, name: &RoomName) -> Option<Room> {
        self.rooms.remove(name)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_creation() {
        let room = Room::new();

        assert!(room.is_empty());
        assert_eq!(room.member_count(), 0);
    }

    #[test]
    fn test_room_add_and_remove() {
        let alice = ClientId::new();
        let bob = ClientId::new();
        let mut room = Room::new();

        assert!(room.add(alice));
        assert!(!room.add(alice));
        assert!(room.add(bob));
        assert_eq!(room.member_count(), 2);
        assert!(room.contains(alice));

        assert!(room.remove(alice));
        assert!(!room.remove(alice));
        assert!(!room.contains(alice));
        assert_eq!(room.member_ids(), vec![bob]);
    }

    #[test]
    fn test_get_or_create_reuses_room() {
        let mut registry = RoomRegistry::new();
        let name = RoomName::new("lobby");
        let alice = ClientId::new();

        registry.get_or_create(&name).add(alice);
        assert_eq!(registry.len(), 1);

        registry.get_or_create(&name);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.member_ids(&name), vec![alice]);
    }

    #[test]
    fn test_empty_room_survives_leave() {
        let mut registry = RoomRegistry::new();
        let name = RoomName::new("lobby");
        let alice = ClientId::new();

        registry.get_or_create(&name).add(alice);
        assert!(registry.remove_member(&name, alice));
        assert!(registry.contains(&name));
        assert!(registry.get(&name).map(Room::is_empty).unwrap_or(false));
    }

    #[test]
    fn test_remove_member_of_unknown_room() {
        let mut registry = RoomRegistry::new();
        assert!(!registry.remove_member(&RoomName::new("nowhere"), ClientId::new()));
        assert!(registry.member_ids(&RoomName::new("nowhere")).is_empty());
    }

    #[test]
    fn test_remove_merged() {
        let mut registry = RoomRegistry::new();
        let name = RoomName::new("annex");
        let bob = ClientId::new();
        registry.get_or_create(&name).add(bob);

        let removed = registry.remove_merged(&name).unwrap();
        assert!(removed.contains(bob));
        assert!(!registry.contains(&name));
        assert!(registry.is_empty());
        assert!(registry.remove_merged(&name).is_none());
    }
}
