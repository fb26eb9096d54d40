//! Core protocol types for Roomcast's wire format.
//!
//! Identities travel on the wire as plain decimal numbers (`"3"`), so
//! the newtypes here know how to parse themselves out of a client's
//! answer to a prompt. Their `Display` impls are for logs, not the wire.

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Assigned by the server on `Get ID`, counting up from zero, and never
/// reused for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Parses a decimal player identity sent by a client.
    ///
    /// Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        parse_u64(text, "player ID").map(Self)
    }
}

/// `tracing::info!(%player_id, ...)` prints "P-42".
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room.
///
/// Same newtype pattern as [`PlayerId`]; room ids also count up from zero
/// and are not reused after a room is garbage-collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Parses a decimal room identity sent by a client.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        parse_u64(text, "room ID").map(Self)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

fn parse_u64(text: &str, field: &'static str) -> Result<u64, ProtocolError> {
    text.trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber {
            field,
            value: text.to_string(),
        })
}

// ---------------------------------------------------------------------------
// World seed
// ---------------------------------------------------------------------------

/// An opaque world seed.
///
/// Clients feed it to their map generator; the server only stores and
/// relays it, byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldSeed(String);

impl WorldSeed {
    /// Wraps a seed value. Blank seeds are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, ProtocolError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage {
                field: "world seed",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the seed exactly as it was received.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// A `MoveTo` payload: `"<identity>,<x>,<y>"`.
///
/// Coordinates are checked to be finite numbers, never validated against
/// any map. A parsed position is relayed with its coordinates exactly as
/// the client wrote them (minus surrounding spaces), so `1.50` stays
/// `1.50`.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// The player that moved.
    pub player_id: PlayerId,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// `"<x>,<y>"` as received; `None` for locally built positions.
    coords: Option<String>,
}

impl Position {
    /// A position built from numbers, formatted in shortest form.
    pub fn new(player_id: PlayerId, x: f64, y: f64) -> Self {
        Self {
            player_id,
            x,
            y,
            coords: None,
        }
    }

    /// Parses a `"<identity>,<x>,<y>"` payload.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidMessage {
            field: "position",
            value: text.to_string(),
        };

        let mut parts = text.split(',');
        let (Some(id), Some(x_text), Some(y_text), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let player_id = PlayerId::parse(id).map_err(|_| invalid())?;
        let (x_text, y_text) = (x_text.trim(), y_text.trim());
        let x: f64 = x_text.parse().map_err(|_| invalid())?;
        let y: f64 = y_text.parse().map_err(|_| invalid())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid());
        }

        Ok(Self {
            player_id,
            x,
            y,
            coords: Some(format!("{x_text},{y_text}")),
        })
    }
}

/// Formats back to the wire payload, e.g. `"3,10,-4.5"`.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.coords {
            Some(coords) => write!(f, "{},{coords}", self.player_id.0),
            None => write!(f, "{},{},{}", self.player_id.0, self.x, self.y),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing entries
// ---------------------------------------------------------------------------

/// Summary of a room for the `See rooms` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListEntry {
    /// The room's unique ID.
    pub room_id: RoomId,
    /// Number of players currently in the room.
    pub player_count: usize,
    /// Maximum players allowed.
    pub max_players: usize,
}

impl RoomListEntry {
    /// Slots still open in the room.
    pub fn space_available(&self) -> usize {
        self.max_players.saturating_sub(self.player_count)
    }
}

/// One member of a room, for the `List Players` replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    /// The member's identity.
    pub player_id: PlayerId,
    /// The member's display name (not unique).
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_parse_trims_whitespace() {
        assert_eq!(PlayerId::parse(" 12\n").unwrap(), PlayerId(12));
    }

    #[test]
    fn test_player_id_parse_rejects_garbage() {
        let err = PlayerId::parse("abc").unwrap_err();
        assert_eq!(err.to_string(), "invalid player ID: 'abc'");
    }

    #[test]
    fn test_room_id_parse_rejects_negative() {
        assert!(RoomId::parse("-1").is_err());
    }

    #[test]
    fn test_display_is_prefixed() {
        assert_eq!(PlayerId(42).to_string(), "P-42");
        assert_eq!(RoomId(7).to_string(), "R-7");
    }

    #[test]
    fn test_world_seed_keeps_value_verbatim() {
        let seed = WorldSeed::new(" 12345 ").unwrap();
        assert_eq!(seed.as_str(), " 12345 ");
        assert!(WorldSeed::new("   ").is_err());
        assert!(WorldSeed::new("").is_err());
    }

    #[test]
    fn test_position_parse_and_format() {
        let pos = Position::parse("3, 10,-4.5").unwrap();
        assert_eq!(pos.player_id, PlayerId(3));
        assert_eq!(pos.x, 10.0);
        assert_eq!(pos.y, -4.5);
        assert_eq!(pos.to_string(), "3,10,-4.5");
    }

    #[test]
    fn test_position_keeps_coordinate_text() {
        let pos = Position::parse("3,1.50,2.0").unwrap();
        assert_eq!(pos.x, 1.5);
        assert_eq!(pos.to_string(), "3,1.50,2.0");
        assert_eq!(Position::new(PlayerId(3), 1.5, 2.0).to_string(), "3,1.5,2");
    }

    #[test]
    fn test_position_rejects_wrong_arity_and_nan() {
        assert!(Position::parse("3,10").is_err());
        assert!(Position::parse("3,10,4,5").is_err());
        assert!(Position::parse("x,10,4").is_err());
        assert!(Position::parse("3,NaN,4").is_err());
    }

    #[test]
    fn test_room_list_entry_space_available() {
        let entry = RoomListEntry {
            room_id: RoomId(0),
            player_count: 3,
            max_players: 4,
        };
        assert_eq!(entry.space_available(), 1);
    }
}
