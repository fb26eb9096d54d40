//! # Roomcast
//!
//! Room-based multiplayer session server.
//!
//! Clients connect over WebSocket, ask for an identity, then create or
//! join bounded rooms. Inside a room the server relays chat, positions
//! and the shared world seed to every member; a player joining after
//! the game started gets the seed straight away.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomcast::prelude::*;
//!
//! # async fn demo() -> Result<(), RoomcastError> {
//! let server = RoomcastServer::builder()
//!     .bind("127.0.0.1:8001")
//!     .build()
//!     .await?;
//! tokio::spawn(server.run());
//!
//! let mut client = RoomcastClient::connect("ws://127.0.0.1:8001").await?;
//! client.handshake().await?;
//! let replies = client.create_room().await?;
//! assert_eq!(replies, vec!["ServM:Welcome to room 0"]);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod engine;
mod error;
mod handler;
mod server;

pub use client::{Answers, RoomcastClient, DEFAULT_DRAIN_WINDOW};
pub use config::ServerConfig;
pub use error::RoomcastError;
pub use server::{LobbyStats, RoomcastServer, RoomcastServerBuilder, ServerHandle};

/// Convenient imports for servers and clients.
pub mod prelude {
    pub use crate::{
        Answers, LobbyStats, RoomcastClient, RoomcastError, RoomcastServer,
        RoomcastServerBuilder, ServerConfig, ServerHandle,
    };
    pub use roomcast_protocol::{
        MemberEntry, PlayerId, Position, Reply, Request, RoomId,
        RoomListEntry, WorldSeed,
    };
    pub use roomcast_room::RoomConfig;
}
