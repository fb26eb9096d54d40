//! A single room: bounded membership, display names, and a world seed.

use std::collections::HashMap;

use roomcast_protocol::{MemberEntry, PlayerId, RoomId, WorldSeed};

use crate::RoomError;

/// A bounded group of players that see each other's chat, movement and
/// seed broadcasts.
///
/// Invariant: `member_count() <= capacity()`. A room is only ever
/// observed with at least one member; the directory deletes it the
/// moment the last member leaves.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    capacity: usize,
    /// Member identity → display name. Names need not be unique.
    members: HashMap<PlayerId, String>,
    /// Set by the first `Start Game` or `Change Seed`, then replayed to
    /// anyone joining later.
    seed: Option<WorldSeed>,
}

impl Room {
    /// Creates an empty room.
    pub fn new(id: RoomId, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            members: HashMap::new(),
            seed: None,
        }
    }

    /// Returns the room's ID.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Returns the maximum number of members.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds a member.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyMember`] if the player is already here; the
    ///   existing display name is kept.
    /// - [`RoomError::Full`] if the room is at capacity.
    pub fn add_member(
        &mut self,
        player_id: PlayerId,
        display_name: impl Into<String>,
    ) -> Result<(), RoomError> {
        if self.members.contains_key(&player_id) {
            return Err(RoomError::AlreadyMember(player_id, self.id));
        }
        if self.members.len() >= self.capacity {
            return Err(RoomError::Full(self.id));
        }
        self.members.insert(player_id, display_name.into());
        Ok(())
    }

    /// Removes a member.
    pub fn remove_member(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        self.members
            .remove(&player_id)
            .map(|_| ())
            .ok_or(RoomError::NotMember(player_id, self.id))
    }

    /// Overwrites a member's display name.
    pub fn rename_member(
        &mut self,
        player_id: PlayerId,
        name: impl Into<String>,
    ) -> Result<(), RoomError> {
        let slot = self
            .members
            .get_mut(&player_id)
            .ok_or(RoomError::NotMember(player_id, self.id))?;
        *slot = name.into();
        Ok(())
    }

    /// Stores the world seed, replacing any previous one.
    pub fn set_seed(&mut self, seed: WorldSeed) {
        self.seed = Some(seed);
    }

    /// Returns the stored world seed, if any.
    pub fn seed(&self) -> Option<&WorldSeed> {
        self.seed.as_ref()
    }

    /// Returns `true` if the player is a member.
    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.members.contains_key(&player_id)
    }

    /// Returns the current number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns how many more players can join.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.members.len())
    }

    /// Returns `true` if the room has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the members ordered by identity.
    pub fn members(&self) -> Vec<MemberEntry> {
        let mut members: Vec<MemberEntry> = self
            .members
            .iter()
            .map(|(player_id, name)| MemberEntry {
                player_id: *player_id,
                name: name.clone(),
            })
            .collect();
        members.sort_by_key(|m| m.player_id);
        members
    }

    /// Returns member identities in no particular order.
    pub fn member_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.members.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    #[test]
    fn test_add_member_until_full() {
        let mut room = Room::new(RoomId(0), 2);
        room.add_member(pid(1), "a").unwrap();
        room.add_member(pid(2), "b").unwrap();
        assert_eq!(room.remaining_capacity(), 0);

        let result = room.add_member(pid(3), "c");
        assert!(matches!(result, Err(RoomError::Full(RoomId(0)))));
        assert_eq!(room.member_count(), 2);
        assert!(!room.is_member(pid(3)));
    }

    #[test]
    fn test_add_member_twice_keeps_original_name() {
        let mut room = Room::new(RoomId(0), 4);
        room.add_member(pid(1), "Ada").unwrap();

        let result = room.add_member(pid(1), "Mallory");
        assert!(matches!(result, Err(RoomError::AlreadyMember(_, _))));
        assert_eq!(room.members()[0].name, "Ada");
        assert_eq!(room.member_count(), 1);
    }

    #[test]
    fn test_already_member_reported_before_full() {
        let mut room = Room::new(RoomId(0), 1);
        room.add_member(pid(1), "a").unwrap();
        assert!(matches!(
            room.add_member(pid(1), "a"),
            Err(RoomError::AlreadyMember(_, _))
        ));
    }

    #[test]
    fn test_remove_member() {
        let mut room = Room::new(RoomId(0), 4);
        room.add_member(pid(1), "a").unwrap();
        room.remove_member(pid(1)).unwrap();
        assert!(room.is_empty());

        assert!(matches!(
            room.remove_member(pid(1)),
            Err(RoomError::NotMember(_, RoomId(0)))
        ));
    }

    #[test]
    fn test_rename_allows_duplicate_names() {
        let mut room = Room::new(RoomId(0), 4);
        room.add_member(pid(1), "Player 1").unwrap();
        room.add_member(pid(2), "Player 2").unwrap();
        room.rename_member(pid(1), "Twin").unwrap();
        room.rename_member(pid(2), "Twin").unwrap();

        let names: Vec<String> =
            room.members().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Twin", "Twin"]);
    }

    #[test]
    fn test_rename_non_member() {
        let mut room = Room::new(RoomId(0), 4);
        assert!(room.rename_member(pid(1), "x").is_err());
    }

    #[test]
    fn test_seed_round_trip() {
        let mut room = Room::new(RoomId(0), 4);
        assert!(room.seed().is_none());

        room.set_seed(WorldSeed::new("12345").unwrap());
        assert_eq!(room.seed().map(WorldSeed::as_str), Some("12345"));

        room.set_seed(WorldSeed::new("forest-7").unwrap());
        assert_eq!(room.seed().map(WorldSeed::as_str), Some("forest-7"));
    }

    #[test]
    fn test_members_sorted_by_id() {
        let mut room = Room::new(RoomId(0), 4);
        room.add_member(pid(9), "z").unwrap();
        room.add_member(pid(2), "y").unwrap();
        room.add_member(pid(5), "x").unwrap();
        let ids: Vec<u64> =
            room.members().iter().map(|m| m.player_id.0).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
