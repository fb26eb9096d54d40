//! Session data types.

use roomcast_protocol::{PlayerId, RoomId};
use tokio::sync::mpsc;

/// Channel sender for delivering outbound text to one connection.
///
/// The connection's writer task owns the receiving end and forwards
/// every queued message to the socket, in order. Sending never blocks,
/// so it is safe to do while holding the lobby lock; it fails only once
/// the writer is gone.
///
/// The queue has no bound: a member whose socket stops draining keeps
/// buffering room traffic until a write fails or its connection closes.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Receiving end of an [`Outbox`].
pub type OutboxReceiver = mpsc::UnboundedReceiver<String>;

/// Creates a connected outbox pair.
pub fn outbox() -> (Outbox, OutboxReceiver) {
    mpsc::unbounded_channel()
}

/// A registered connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// The identity handed out at handshake.
    pub player_id: PlayerId,

    /// The room the player is in, if any.
    ///
    /// This is a lookup key, not ownership: the room may be gone by the
    /// time someone follows it, in which case the lookup simply misses.
    pub room: Option<RoomId>,

    /// Name shown to other members. Defaults to `"Player <id>"`.
    pub display_name: String,

    /// Where to queue text for this connection.
    pub outbox: Outbox,
}

impl Session {
    pub(crate) fn new(player_id: PlayerId, outbox: Outbox) -> Self {
        Self {
            player_id,
            room: None,
            display_name: default_display_name(player_id),
            outbox,
        }
    }
}

/// The placeholder name a player has until it sets a nickname.
fn default_display_name(player_id: PlayerId) -> String {
    format!("Player {}", player_id.0)
}
