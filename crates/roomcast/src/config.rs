//! Server configuration.

use std::path::Path;
use std::time::Duration;

use roomcast_room::RoomConfig;
use serde::{Deserialize, Serialize};

use crate::RoomcastError;

/// Everything the server needs to start.
///
/// Every field has a default, so a config file only needs the keys it
/// wants to change:
///
/// ```json
/// { "bind_addr": "0.0.0.0:9000", "room": { "max_players": 6 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Applied to every room the server creates.
    pub room: RoomConfig,

    /// Close connections that send nothing for this many seconds.
    /// `None` disables the timeout.
    pub idle_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8001".to_string(),
            room: RoomConfig::default(),
            idle_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Parses a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, RoomcastError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoomcastError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            RoomcastError::ConfigIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_json(&text)
    }

    /// The idle timeout as a [`Duration`], if enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}
