//! Decoding of client requests.
//!
//! Every inbound text frame is decoded exactly once, here, into a
//! [`Request`]. The session engine matches on the variant and never
//! looks at raw request strings.

use crate::PlayerId;

/// Tag that opens a chat line: `"PID###<id>: <text>"`.
///
/// The handshake reply uses the same tag (`"PID###<id>"`), so a client
/// can prefix its chat lines with exactly what it was given.
pub const PLAYER_TAG: &str = "PID###";

/// A request sent by a client, decoded from one text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `Get ID`: ask for an identity.
    Handshake,
    /// `See rooms`: list rooms and their free space.
    ListRooms,
    /// `Create Room`: open a room and join it.
    CreateRoom,
    /// `Join Room`: join an existing room.
    JoinRoom,
    /// `Leave Room`: leave the current room.
    LeaveRoom,
    /// `Leave Game`: leave, unregister, and close.
    ExitGame,
    /// `List Players` / `List PlayersRaw`.
    ListPlayers {
        /// `true` for the machine-parseable variant.
        raw: bool,
    },
    /// `MoveTo`: relay a position to the room.
    MoveTo,
    /// `Start Game`: store a seed and announce the game start.
    StartGame,
    /// `Change Seed`: replace the room's seed.
    ChangeSeed,
    /// `Room Seed`: fetch a room's stored seed.
    RoomSeed,
    /// `Set Nick`: change this player's display name.
    SetNick,
    /// `PID###<id>: <text>`: chat text for the sender's room.
    Chat {
        /// The identity the client tagged the line with.
        player_id: PlayerId,
        /// The chat text, without the tag.
        text: String,
    },
    /// A line carrying the chat tag that could not be split into an
    /// identity and text.
    MalformedChat(String),
    /// Anything else.
    Unknown(String),
}

impl Request {
    /// Decodes one inbound line.
    ///
    /// Never fails: unrecognized input becomes [`Request::Unknown`] or
    /// [`Request::MalformedChat`] so the engine can decide how to answer.
    pub fn decode(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            "Get ID" => Self::Handshake,
            "See rooms" => Self::ListRooms,
            "Create Room" => Self::CreateRoom,
            "Join Room" => Self::JoinRoom,
            "Leave Room" => Self::LeaveRoom,
            "Leave Game" | "Leave game" => Self::ExitGame,
            "List Players" => Self::ListPlayers { raw: false },
            "List PlayersRaw" => Self::ListPlayers { raw: true },
            "MoveTo" => Self::MoveTo,
            "Start Game" => Self::StartGame,
            "Change Seed" => Self::ChangeSeed,
            "Room Seed" => Self::RoomSeed,
            "Set Nick" => Self::SetNick,
            _ if line.starts_with(PLAYER_TAG) => decode_chat(line),
            _ => Self::Unknown(line.to_string()),
        }
    }
}

fn decode_chat(line: &str) -> Request {
    let Some((tag, text)) = line.split_once(':') else {
        return Request::MalformedChat(line.to_string());
    };
    let id = &tag[PLAYER_TAG.len()..];
    match PlayerId::parse(id) {
        Ok(player_id) => Request::Chat {
            player_id,
            text: text.strip_prefix(' ').unwrap_or(text).to_string(),
        },
        Err(_) => Request::MalformedChat(line.to_string()),
    }
}

/// Formats a chat line the way [`Request::decode`] expects it.
pub fn chat_line(player_id: PlayerId, text: &str) -> String {
    format!("{PLAYER_TAG}{}: {text}", player_id.0)
}
