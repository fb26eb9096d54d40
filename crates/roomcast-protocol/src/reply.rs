//! Server-to-client tokens: prompts and replies.
//!
//! Multi-step requests are driven by the server: after `Join Room` it
//! sends [`Prompt::RoomId`], waits for the answer, then sends
//! [`Prompt::PlayerId`]. Everything else the server says is a
//! [`Reply`], encoded to text with [`Reply::encode`].

use std::fmt::Write as _;

use crate::{MemberEntry, PlayerId, Position, RoomId, RoomListEntry, WorldSeed};

/// Prefix of human-readable status text.
///
/// Clients route `ServM:` lines to a server panel and everything else
/// (chat, seeds, moves) to the game.
pub const STATUS_TAG: &str = "ServM:";

/// A question the server asks in the middle of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Expects a decimal player identity.
    PlayerId,
    /// Expects a decimal room identity.
    RoomId,
    /// Expects an opaque seed value.
    WorldSeed,
    /// Expects `"<identity>,<x>,<y>"`.
    Position,
    /// Expects a display name.
    Nickname,
}

impl Prompt {
    /// The wire token for this prompt.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlayerId => "Enter Player ID",
            Self::RoomId => "Enter Room ID",
            Self::WorldSeed => "Enter World Seed",
            Self::Position => "Enter Position",
            Self::Nickname => "Enter Nickname",
        }
    }

    /// Recognizes a prompt token, for clients.
    pub fn parse(text: &str) -> Option<Self> {
        [
            Self::PlayerId,
            Self::RoomId,
            Self::WorldSeed,
            Self::Position,
            Self::Nickname,
        ]
        .into_iter()
        .find(|prompt| prompt.as_str() == text)
    }
}

/// Everything the server sends that is not a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    // --- direct replies -------------------------------------------------
    /// Handshake result: `PID###<id>`.
    Identity(PlayerId),
    /// A request other than `Get ID` arrived before the handshake.
    NotIdentified,
    /// The `See rooms` listing.
    Rooms(Vec<RoomListEntry>),
    /// A room was created with the requester in it.
    Welcome(RoomId),
    /// The requester must leave its current room first.
    AlreadyInRoom(RoomId),
    /// The requester joined a room.
    Added {
        /// Who joined.
        player_id: PlayerId,
        /// Which room.
        room_id: RoomId,
    },
    /// The requester left a room.
    OutOfRoom {
        /// Who left.
        player_id: PlayerId,
        /// Which room.
        room_id: RoomId,
    },
    /// The requester unregistered; the connection is about to close.
    Removed(PlayerId),
    /// A room-scoped request while the requester has no room.
    NotInRoom,
    /// A room-scoped request naming a room the requester is not in.
    NotMemberOf {
        /// The requester.
        player_id: PlayerId,
        /// The room it named.
        room_id: RoomId,
    },
    /// The room does not exist.
    RoomNotFound(RoomId),
    /// The room is at capacity.
    RoomFull(RoomId),
    /// A prompted or tagged identity is not the connection's own.
    IdentityMismatch(PlayerId),
    /// `List Players` reply.
    Players {
        /// The room listed.
        room_id: RoomId,
        /// Its members, ordered by identity.
        members: Vec<MemberEntry>,
    },
    /// `List PlayersRaw` reply: `<id>:<name>;<id>:<name>`.
    PlayersRaw(Vec<MemberEntry>),
    /// `Room Seed` reply: the stored seed, verbatim.
    Seed(WorldSeed),
    /// `Room Seed` for a room with no seed yet.
    NoSeed(RoomId),
    /// `Set Nick` succeeded.
    NickSet(String),
    /// The client's answer could not be decoded.
    Invalid(String),
    /// A request token the server does not know.
    Unrecognized,
    /// The request was aborted on an internal error.
    RequestFailed,

    // --- room pushes ----------------------------------------------------
    /// Someone joined the room.
    PlayerJoined {
        /// Who joined.
        player_id: PlayerId,
        /// Which room.
        room_id: RoomId,
    },
    /// Someone left the room.
    PlayerLeft {
        /// Who left.
        player_id: PlayerId,
        /// Which room.
        room_id: RoomId,
    },
    /// Marker preceding a seed when a game starts.
    StartGame,
    /// Marker preceding a seed when it changes.
    ChangeSeed,
    /// A relayed position: `MoveTo: <id>,<x>,<y>`.
    Moved(Position),
    /// Relayed chat text, verbatim.
    Chat(String),
}

impl Reply {
    /// Encodes the reply as a single text frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Identity(pid) => format!("PID###{}", pid.0),
            Self::NotIdentified => {
                status("Request an ID with 'Get ID' first")
            }
            Self::Rooms(rooms) if rooms.is_empty() => status("No rooms found"),
            Self::Rooms(rooms) => {
                let lines: Vec<String> = rooms
                    .iter()
                    .map(|r| {
                        format!(
                            "<Room {}: Space Available - {} >",
                            r.room_id.0,
                            r.space_available()
                        )
                    })
                    .collect();
                status(&lines.join("\n"))
            }
            Self::Welcome(rid) => status(&format!("Welcome to room {}", rid.0)),
            Self::AlreadyInRoom(rid) => status(&format!(
                "Already in room {}. Please leave room before joining or creating another",
                rid.0
            )),
            Self::Added { player_id, room_id } => status(&format!(
                "Player {} added to room {}",
                player_id.0, room_id.0
            )),
            Self::OutOfRoom { player_id, room_id } => status(&format!(
                "Player {} out of room {}",
                player_id.0, room_id.0
            )),
            Self::Removed(pid) => status(&format!("Player {} removed", pid.0)),
            Self::NotInRoom => status("Not in a room"),
            Self::NotMemberOf { player_id, room_id } => status(&format!(
                "Player {} is not in room {}",
                player_id.0, room_id.0
            )),
            Self::RoomNotFound(rid) => {
                status(&format!("Room {} does not exist", rid.0))
            }
            Self::RoomFull(rid) => status(&format!(
                "Room {} is full. Find another room",
                rid.0
            )),
            Self::IdentityMismatch(pid) => status(&format!(
                "Player {} does not belong to this connection",
                pid.0
            )),
            Self::Players { room_id, members } => {
                let mut text = format!("Players in room {}:", room_id.0);
                for m in members {
                    let _ = write!(text, "\n<{}: {} >", m.player_id.0, m.name);
                }
                status(&text)
            }
            Self::PlayersRaw(members) => members
                .iter()
                .map(|m| format!("{}:{}", m.player_id.0, m.name))
                .collect::<Vec<_>>()
                .join(";"),
            Self::Seed(seed) => seed.as_str().to_string(),
            Self::NoSeed(rid) => {
                status(&format!("Room {} has no world seed", rid.0))
            }
            Self::NickSet(name) => status(&format!("Nickname set to {name}")),
            Self::Invalid(reason) => status(&capitalize(reason)),
            Self::Unrecognized => status("Unrecognized request"),
            Self::RequestFailed => status("Request failed"),
            Self::PlayerJoined { player_id, room_id } => status(&format!(
                "Player {} joined room {}",
                player_id.0, room_id.0
            )),
            Self::PlayerLeft { player_id, room_id } => status(&format!(
                "Player {} left room {}",
                player_id.0, room_id.0
            )),
            Self::StartGame => "Start Game".to_string(),
            Self::ChangeSeed => "Change Seed".to_string(),
            Self::Moved(pos) => format!("MoveTo: {pos}"),
            Self::Chat(text) => text.clone(),
        }
    }
}

fn status(text: &str) -> String {
    format!("{STATUS_TAG}{text}")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parses a `List PlayersRaw` reply back into entries, for clients.
///
/// Returns `None` if any entry lacks the `<id>:` prefix.
pub fn parse_players_raw(text: &str) -> Option<Vec<MemberEntry>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    text.split(';')
        .map(|entry| {
            let (id, name) = entry.split_once(':')?;
            Some(MemberEntry {
                player_id: PlayerId::parse(id).ok()?,
                name: name.to_string(),
            })
        })
        .collect()
}
