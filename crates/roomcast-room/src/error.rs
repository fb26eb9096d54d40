//! Error types for the room layer.

use roomcast_protocol::{PlayerId, RoomId};
use roomcast_session::SessionError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room is full: no more player slots available.
    #[error("room {0} is full")]
    Full(RoomId),

    /// The player is already in a room and must leave it first.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is already a member of this room.
    #[error("player {0} is already a member of room {1}")]
    AlreadyMember(PlayerId, RoomId),

    /// The player is not in any room.
    #[error("player {0} is not in any room")]
    NotInRoom(PlayerId),

    /// The player is not a member of this room.
    #[error("player {0} not in room {1}")]
    NotMember(PlayerId, RoomId),

    /// The registry has no such player.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Room and registry disagree. Aborts the current request only.
    #[error("room invariant violated: {0}")]
    Invariant(String),
}
