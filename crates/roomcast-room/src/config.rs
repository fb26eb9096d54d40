//! Room configuration.

use serde::{Deserialize, Serialize};

/// Configuration applied to every room the server creates.
///
/// Deserializable so it can sit inside the server's JSON config file;
/// missing fields fall back to [`RoomConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Maximum players allowed in a room.
    pub max_players: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { max_players: 4 }
    }
}
