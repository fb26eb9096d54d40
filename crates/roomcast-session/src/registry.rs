//! The connection registry: every identified connection, by identity.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself: it uses a plain
//! `HashMap`. The server keeps it next to the room directory behind one
//! lock, so a join or leave updates both atomically.

use std::collections::HashMap;

use roomcast_protocol::{PlayerId, RoomId};

use crate::{Outbox, Session, SessionError};

/// Maps player identities to their live sessions.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ set_room(Some) ──→ set_room(None) ──→ unregister()
///     │                                                    ▲
///     └────────────────────────────────────────────────────┘
/// ```
///
/// Identities count up from zero and are never handed out twice, even
/// after the player they belonged to has gone.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<PlayerId, Session>,
    next_player_id: u64,
}

impl ConnectionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns its new identity.
    pub fn register(&mut self, outbox: Outbox) -> PlayerId {
        let player_id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        self.sessions.insert(player_id, Session::new(player_id, outbox));
        tracing::info!(%player_id, "session registered");
        player_id
    }

    /// Looks up a session.
    pub fn get(&self, player_id: PlayerId) -> Result<&Session, SessionError> {
        self.sessions
            .get(&player_id)
            .ok_or(SessionError::NotFound(player_id))
    }

    /// Returns a clone of the player's outbox, if registered.
    pub fn outbox(&self, player_id: PlayerId) -> Option<Outbox> {
        self.sessions.get(&player_id).map(|s| s.outbox.clone())
    }

    /// Returns the room the player is in.
    pub fn room_of(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<RoomId>, SessionError> {
        self.get(player_id).map(|s| s.room)
    }

    /// Records which room, if any, the player is in.
    pub fn set_room(
        &mut self,
        player_id: PlayerId,
        room: Option<RoomId>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        session.room = room;
        Ok(())
    }

    /// Changes the player's display name for rooms joined from now on.
    pub fn rename(
        &mut self,
        player_id: PlayerId,
        name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        session.display_name = name.into();
        Ok(())
    }

    /// Removes a session.
    ///
    /// # Errors
    /// - [`SessionError::StillInRoom`] if the player has not left its
    ///   room yet; the session is left in place.
    /// - [`SessionError::NotFound`] if there is no such session.
    pub fn unregister(
        &mut self,
        player_id: PlayerId,
    ) -> Result<Session, SessionError> {
        let session = self.get(player_id)?;
        if let Some(room_id) = session.room {
            return Err(SessionError::StillInRoom(player_id, room_id));
        }
        let session = self
            .sessions
            .remove(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        tracing::info!(%player_id, "session unregistered");
        Ok(session)
    }

    /// Returns `true` if the player is registered.
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.sessions.contains_key(&player_id)
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
