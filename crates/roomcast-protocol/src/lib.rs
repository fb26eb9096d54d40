//! Wire protocol for Roomcast.
//!
//! This crate defines the "language" that clients and the server speak.
//! Every message is one text frame:
//!
//! - **Requests** ([`Request`]): client → server, decoded once at the
//!   connection boundary.
//! - **Prompts** ([`Prompt`]): server → client questions asked in the
//!   middle of a multi-step request ("Enter Room ID").
//! - **Replies** ([`Reply`]): everything else the server sends, direct
//!   answers and room pushes alike.
//!
//! # Architecture
//!
//! ```text
//! Transport (text frames) → Protocol (Request / Reply) → Session engine
//! ```
//!
//! The protocol layer does not know about connections or rooms; it only
//! turns text into typed values and back.

mod error;
mod reply;
mod request;
mod types;

pub use error::ProtocolError;
pub use reply::{parse_players_raw, Prompt, Reply, STATUS_TAG};
pub use request::{chat_line, Request, PLAYER_TAG};
pub use types::{
    MemberEntry, PlayerId, Position, RoomId, RoomListEntry, WorldSeed,
};
