//! Integration tests for the room directory and its registry bookkeeping.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roomcast_protocol::{PlayerId, RoomId, WorldSeed};
use roomcast_room::{deliver, RoomDirectory, RoomError};
use roomcast_session::{outbox, ConnectionRegistry, OutboxReceiver};

// =========================================================================
// Helpers
// =========================================================================

struct Fixture {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory: RoomDirectory::new(),
        }
    }

    /// Registers a player and keeps its receiving end.
    fn player(&mut self) -> (PlayerId, OutboxReceiver) {
        let (tx, rx) = outbox();
        (self.registry.register(tx), rx)
    }

    fn join(&mut self, room_id: RoomId, player_id: PlayerId) -> Result<(), RoomError> {
        self.directory
            .join_room(&mut self.registry, room_id, player_id)
    }

    fn leave(&mut self, player_id: PlayerId) -> Result<RoomId, RoomError> {
        self.directory.leave_room(&mut self.registry, player_id)
    }

    /// Asserts the at-most-one-room and capacity invariants.
    fn check_invariants(&self) {
        for entry in self.directory.list_rooms() {
            assert!(entry.player_count >= 1, "empty room {:?} observable", entry.room_id);
            assert!(entry.player_count <= entry.max_players);
            for member in self.directory.list_members(entry.room_id).unwrap() {
                assert_eq!(
                    self.registry.room_of(member.player_id).unwrap(),
                    Some(entry.room_id)
                );
            }
        }
    }
}

fn drain(rx: &mut OutboxReceiver) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

// =========================================================================
// Creation and joining
// =========================================================================

#[test]
fn test_create_room_ids_are_monotonic() {
    let mut dir = RoomDirectory::new();
    let r0 = dir.create_room(4);
    let r1 = dir.create_room(4);
    assert_eq!(r0, RoomId(0));
    assert_eq!(r1, RoomId(1));
    assert_eq!(dir.room_count(), 2);
}

#[test]
fn test_room_ids_not_reused_after_delete() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let r0 = fx.directory.create_room(4);
    fx.join(r0, a).unwrap();
    fx.leave(a).unwrap();

    let r1 = fx.directory.create_room(4);
    assert_ne!(r0, r1);
}

#[test]
fn test_join_room_sets_registry_pointer() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let room = fx.directory.create_room(4);

    fx.join(room, a).unwrap();

    assert_eq!(fx.registry.room_of(a).unwrap(), Some(room));
    assert_eq!(fx.directory.get(room).unwrap().member_count(), 1);
    fx.check_invariants();
}

#[test]
fn test_join_room_not_found() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let result = fx.join(RoomId(999), a);
    assert!(matches!(result, Err(RoomError::NotFound(RoomId(999)))));
    assert_eq!(fx.registry.room_of(a).unwrap(), None);
}

#[test]
fn test_join_room_unknown_player() {
    let mut fx = Fixture::new();
    let room = fx.directory.create_room(4);
    let result = fx.join(room, PlayerId(77));
    assert!(matches!(result, Err(RoomError::Session(_))));
}

#[test]
fn test_join_room_one_room_at_a_time() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let (b, _rx_b) = fx.player();
    let r1 = fx.directory.create_room(4);
    let r2 = fx.directory.create_room(4);
    fx.join(r1, a).unwrap();
    fx.join(r2, b).unwrap();

    let result = fx.join(r2, a);
    assert!(matches!(result, Err(RoomError::AlreadyInRoom(_, r)) if r == r1));
    assert!(!fx.directory.get(r2).unwrap().is_member(a));
    fx.check_invariants();
}

#[test]
fn test_join_same_room_twice_is_rejected() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();

    assert!(matches!(fx.join(room, a), Err(RoomError::AlreadyInRoom(_, _))));
    assert_eq!(fx.directory.get(room).unwrap().member_count(), 1);
}

#[test]
fn test_fifth_join_is_rejected_full() {
    let mut fx = Fixture::new();
    let room = fx.directory.create_room(4);
    let mut players = Vec::new();
    for _ in 0..5 {
        players.push(fx.player());
    }

    for (pid, _) in &players[..4] {
        fx.join(room, *pid).unwrap();
    }
    let fifth = players[4].0;
    let result = fx.join(room, fifth);

    assert!(matches!(result, Err(RoomError::Full(r)) if r == room));
    assert_eq!(fx.directory.get(room).unwrap().member_count(), 4);
    assert_eq!(fx.registry.room_of(fifth).unwrap(), None);
    fx.check_invariants();
}

#[test]
fn test_joiner_name_comes_from_registry() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    fx.registry.rename(a, "Ada").unwrap();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();

    let members = fx.directory.list_members(room).unwrap();
    assert_eq!(members[0].name, "Ada");
}

// =========================================================================
// Leaving and garbage collection
// =========================================================================

#[test]
fn test_leave_room_clears_pointer_and_deletes_empty_room() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();

    assert_eq!(fx.leave(a).unwrap(), room);

    assert_eq!(fx.registry.room_of(a).unwrap(), None);
    assert!(!fx.directory.contains(room));
    assert!(fx.directory.list_rooms().is_empty());
}

#[test]
fn test_room_survives_while_members_remain() {
    let mut fx = Fixture::new();
    let (a, _ra) = fx.player();
    let (b, _rb) = fx.player();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();
    fx.join(room, b).unwrap();

    fx.leave(b).unwrap();
    assert!(fx.directory.contains(room));
    assert_eq!(fx.directory.get(room).unwrap().member_count(), 1);

    fx.leave(a).unwrap();
    assert!(!fx.directory.contains(room));
}

#[test]
fn test_leave_room_not_in_any_room() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    assert!(matches!(fx.leave(a), Err(RoomError::NotInRoom(p)) if p == a));
}

#[test]
fn test_leave_then_join_elsewhere() {
    let mut fx = Fixture::new();
    let (a, _ra) = fx.player();
    let (b, _rb) = fx.player();
    let r1 = fx.directory.create_room(4);
    let r2 = fx.directory.create_room(4);
    fx.join(r1, a).unwrap();
    fx.join(r2, b).unwrap();

    fx.leave(a).unwrap();
    fx.join(r2, a).unwrap();
    assert_eq!(fx.registry.room_of(a).unwrap(), Some(r2));
    assert!(!fx.directory.contains(r1));
    fx.check_invariants();
}

#[test]
fn test_discard_if_empty_only_removes_empty_rooms() {
    let mut fx = Fixture::new();
    let (a, _rx) = fx.player();
    let empty = fx.directory.create_room(4);
    let busy = fx.directory.create_room(4);
    fx.join(busy, a).unwrap();

    assert!(fx.directory.discard_if_empty(empty));
    assert!(!fx.directory.discard_if_empty(busy));
    assert!(!fx.directory.discard_if_empty(RoomId(42)));
    assert_eq!(fx.directory.room_count(), 1);
}

#[test]
fn test_random_join_leave_sequence_keeps_invariants() {
    let mut fx = Fixture::new();
    let mut players = Vec::new();
    for _ in 0..8 {
        players.push(fx.player());
    }
    let ids: Vec<PlayerId> = players.iter().map(|(p, _)| *p).collect();

    // Seeded so a failure replays the same walk.
    let mut rng = StdRng::seed_from_u64(0x2545_f491);
    let first = fx.directory.create_room(3);
    fx.join(first, ids[0]).unwrap();
    let mut rooms = vec![first];
    for _ in 0..500 {
        let who = ids[rng.random_range(0..ids.len())];
        match rng.random_range(0..4u8) {
            0 => {
                let room = fx.directory.create_room(3);
                if fx.join(room, who).is_err() {
                    fx.directory.discard_if_empty(room);
                } else {
                    rooms.push(room);
                }
            }
            1 | 2 => {
                let room = rooms[rng.random_range(0..rooms.len())];
                let _ = fx.join(room, who);
            }
            _ => {
                let _ = fx.leave(who);
            }
        }
        fx.check_invariants();
        for id in &ids {
            let in_rooms = fx
                .directory
                .list_rooms()
                .iter()
                .filter(|r| fx.directory.get(r.room_id).unwrap().is_member(*id))
                .count();
            assert!(in_rooms <= 1, "player {id} in {in_rooms} rooms");
        }
    }
}

// =========================================================================
// Broadcast
// =========================================================================

#[test]
fn test_broadcast_reaches_every_member() {
    let mut fx = Fixture::new();
    let (a, mut ra) = fx.player();
    let (b, mut rb) = fx.player();
    let (_c, mut rc) = fx.player();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();
    fx.join(room, b).unwrap();

    let delivered = fx
        .directory
        .broadcast(&fx.registry, room, "hello")
        .unwrap();

    assert_eq!(delivered, 2);
    assert_eq!(drain(&mut ra), vec!["hello"]);
    assert_eq!(drain(&mut rb), vec!["hello"]);
    assert!(drain(&mut rc).is_empty(), "non-member must not receive");
}

#[test]
fn test_broadcast_isolates_failed_recipient() {
    let mut fx = Fixture::new();
    let (a, mut ra) = fx.player();
    let (b, rb) = fx.player();
    let (c, mut rc) = fx.player();
    let room = fx.directory.create_room(4);
    for pid in [a, b, c] {
        fx.join(room, pid).unwrap();
    }

    // b's connection is gone.
    drop(rb);

    let delivered = fx
        .directory
        .broadcast(&fx.registry, room, "still here")
        .unwrap();
    assert_eq!(delivered, 2);
    assert_eq!(drain(&mut ra), vec!["still here"]);
    assert_eq!(drain(&mut rc), vec!["still here"]);
}

#[test]
fn test_broadcast_unknown_room() {
    let fx = Fixture::new();
    let result = fx.directory.broadcast(&fx.registry, RoomId(3), "x");
    assert!(matches!(result, Err(RoomError::NotFound(RoomId(3)))));
}

#[test]
fn test_recipients_captured_then_delivered() {
    let mut fx = Fixture::new();
    let (a, mut ra) = fx.player();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();

    let recipients = fx.directory.recipients(&fx.registry, room).unwrap();
    // The room changes after capture; delivery uses the captured list.
    fx.leave(a).unwrap();
    assert_eq!(deliver(&recipients, "late"), 1);
    assert_eq!(drain(&mut ra), vec!["late"]);
}

// =========================================================================
// Listing and seeds
// =========================================================================

#[test]
fn test_list_rooms_reports_occupancy_in_id_order() {
    let mut fx = Fixture::new();
    let (a, _ra) = fx.player();
    let (b, _rb) = fx.player();
    let (c, _rc) = fx.player();
    let r0 = fx.directory.create_room(4);
    let r1 = fx.directory.create_room(4);
    fx.join(r1, a).unwrap();
    fx.join(r0, b).unwrap();
    fx.join(r0, c).unwrap();

    let rooms = fx.directory.list_rooms();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].room_id, r0);
    assert_eq!(rooms[0].space_available(), 2);
    assert_eq!(rooms[1].room_id, r1);
    assert_eq!(rooms[1].space_available(), 3);
}

#[test]
fn test_list_members_unknown_room() {
    let fx = Fixture::new();
    assert!(fx.directory.list_members(RoomId(0)).is_err());
}

#[test]
fn test_seed_survives_membership_changes() {
    let mut fx = Fixture::new();
    let (a, _ra) = fx.player();
    let (b, _rb) = fx.player();
    let room = fx.directory.create_room(4);
    fx.join(room, a).unwrap();
    fx.directory
        .get_mut(room)
        .unwrap()
        .set_seed(WorldSeed::new("12345").unwrap());

    fx.join(room, b).unwrap();
    fx.leave(a).unwrap();

    let seed = fx.directory.get(room).unwrap().seed().cloned();
    assert_eq!(seed, Some(WorldSeed::new("12345").unwrap()));
}
