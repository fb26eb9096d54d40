//! Room directory: creates, tracks, and garbage-collects rooms.

use std::collections::BTreeMap;

use roomcast_protocol::{MemberEntry, PlayerId, RoomId, RoomListEntry};
use roomcast_session::{ConnectionRegistry, Outbox};

use crate::{Room, RoomError};

/// All active rooms, keyed by room ID.
///
/// Every operation that changes membership takes the
/// [`ConnectionRegistry`] as well, because the registry holds each
/// player's room pointer. A player can be in at most ONE room at a time
/// (key invariant), and every room in the directory has at least one
/// member between operations.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    /// Ordered so listings come out by room ID.
    rooms: BTreeMap<RoomId, Room>,
    next_room_id: u64,
}

impl RoomDirectory {
    /// Creates a new, empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty room and returns its ID.
    ///
    /// The caller must add the first member in the same critical
    /// section, or call [`discard_if_empty`](Self::discard_if_empty).
    pub fn create_room(&mut self, capacity: usize) -> RoomId {
        let room_id = RoomId(self.next_room_id);
        self.next_room_id += 1;
        self.rooms.insert(room_id, Room::new(room_id, capacity));
        tracing::info!(%room_id, capacity, "room created");
        room_id
    }

    /// Removes the room if it has no members. Returns `true` if removed.
    pub fn discard_if_empty(&mut self, room_id: RoomId) -> bool {
        let empty = self.rooms.get(&room_id).is_some_and(Room::is_empty);
        if empty {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room deleted");
        }
        empty
    }

    /// Adds a player to a room and points the registry at it.
    ///
    /// # Errors
    /// - [`RoomError::Session`]: the player is not registered
    /// - [`RoomError::AlreadyInRoom`]: the player must leave first
    /// - [`RoomError::NotFound`]: no such room
    /// - [`RoomError::Full`] / [`RoomError::AlreadyMember`]: from the room
    pub fn join_room(
        &mut self,
        registry: &mut ConnectionRegistry,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), RoomError> {
        let session = registry.get(player_id)?;
        if let Some(current) = session.room {
            return Err(RoomError::AlreadyInRoom(player_id, current));
        }
        let display_name = session.display_name.clone();

        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        room.add_member(player_id, display_name)?;
        let players = room.member_count();

        if let Err(e) = registry.set_room(player_id, Some(room_id)) {
            // Registry lookup succeeded above, so this cannot happen
            // while the caller holds the lock. Undo the add regardless.
            let _ = room.remove_member(player_id);
            return Err(e.into());
        }

        tracing::info!(%room_id, %player_id, players, "player joined");
        Ok(())
    }

    /// Removes a player from its current room and clears its room
    /// pointer. Deletes the room if it is now empty.
    ///
    /// Returns the room that was left.
    pub fn leave_room(
        &mut self,
        registry: &mut ConnectionRegistry,
        player_id: PlayerId,
    ) -> Result<RoomId, RoomError> {
        let room_id = registry
            .room_of(player_id)?
            .ok_or(RoomError::NotInRoom(player_id))?;
        registry.set_room(player_id, None)?;

        let room = self.rooms.get_mut(&room_id).ok_or_else(|| {
            RoomError::Invariant(format!(
                "player {player_id} pointed at missing room {room_id}"
            ))
        })?;
        if room.remove_member(player_id).is_err() {
            return Err(RoomError::Invariant(format!(
                "player {player_id} pointed at room {room_id} without being a member"
            )));
        }

        tracing::info!(
            %room_id,
            %player_id,
            players = room.member_count(),
            "player left"
        );
        self.discard_if_empty(room_id);
        Ok(room_id)
    }

    /// Captures the outboxes of every current member of a room, for
    /// [`deliver`].
    pub fn recipients(
        &self,
        registry: &ConnectionRegistry,
        room_id: RoomId,
    ) -> Result<Vec<Outbox>, RoomError> {
        let room = self.get(room_id)?;
        let mut outboxes = Vec::with_capacity(room.member_count());
        for player_id in room.member_ids() {
            match registry.outbox(player_id) {
                Some(outbox) => outboxes.push(outbox),
                None => tracing::error!(
                    %room_id,
                    %player_id,
                    "room member missing from registry"
                ),
            }
        }
        Ok(outboxes)
    }

    /// Sends a message to every member of a room.
    ///
    /// Returns how many members it was delivered to.
    pub fn broadcast(
        &self,
        registry: &ConnectionRegistry,
        room_id: RoomId,
        message: &str,
    ) -> Result<usize, RoomError> {
        let recipients = self.recipients(registry, room_id)?;
        Ok(deliver(&recipients, message))
    }

    /// Returns a room's members ordered by identity.
    pub fn list_members(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<MemberEntry>, RoomError> {
        self.get(room_id).map(Room::members)
    }

    /// Lists all rooms with their occupancy, ordered by room ID.
    pub fn list_rooms(&self) -> Vec<RoomListEntry> {
        self.rooms
            .values()
            .map(|room| RoomListEntry {
                room_id: room.id(),
                player_count: room.member_count(),
                max_players: room.capacity(),
            })
            .collect()
    }

    /// Looks up a room.
    pub fn get(&self, room_id: RoomId) -> Result<&Room, RoomError> {
        self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))
    }

    /// Looks up a room for modification.
    pub fn get_mut(&mut self, room_id: RoomId) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))
    }

    /// Returns `true` if the room exists.
    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Queues `message` on each outbox.
///
/// A closed outbox (its connection is gone) is skipped; the others still
/// receive the message. Returns the number of successful deliveries.
pub fn deliver(recipients: &[Outbox], message: &str) -> usize {
    recipients
        .iter()
        .filter(|outbox| outbox.send(message.to_string()).is_ok())
        .count()
}
