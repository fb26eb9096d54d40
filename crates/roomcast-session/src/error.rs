//! Error types for the session layer.

use roomcast_protocol::{PlayerId, RoomId};

/// Errors that can occur in the connection registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is registered for the given player.
    /// Either the identity was never handed out, or the connection
    /// already went away.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// Tried to unregister a player that is still in a room.
    /// The room must be left first so it never holds a member the
    /// registry no longer knows about.
    #[error("player {0} is still in room {1}")]
    StillInRoom(PlayerId, RoomId),
}
