//! Building, running and observing a Roomcast server.
//!
//! The server owns the listener and one [`Lobby`]. Every accepted socket
//! gets its own task; all of them share the lobby through [`ServerState`].

use std::sync::Arc;
use std::time::Duration;

use roomcast_protocol::RoomListEntry;
use roomcast_room::{RoomConfig, RoomDirectory};
use roomcast_session::ConnectionRegistry;
use roomcast_transport::{Incoming, Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{RoomcastError, ServerConfig};

/// The registry and the directory, always locked together.
///
/// A join touches the room's member table and the player's room
/// pointer; keeping both behind one lock means no task ever sees one
/// updated without the other.
#[derive(Debug, Default)]
pub(crate) struct Lobby {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) directory: RoomDirectory,
}

/// What every connection task sees: the lobby and the fixed config.
pub(crate) struct ServerState {
    pub(crate) lobby: Mutex<Lobby>,
    pub(crate) config: ServerConfig,
}

impl ServerState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        Self {
            lobby: Mutex::new(Lobby::default()),
            config,
        }
    }
}

/// Builder for configuring and starting a Roomcast server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), roomcast::RoomcastError> {
/// use roomcast::RoomcastServer;
///
/// let server = RoomcastServer::builder()
///     .bind("0.0.0.0:8001")
///     .max_players(6)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RoomcastServerBuilder {
    config: ServerConfig,
}

impl RoomcastServerBuilder {
    /// Starts from [`ServerConfig::default`].
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the listen address, e.g. `127.0.0.1:0` in tests.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the capacity of newly created rooms.
    pub fn max_players(mut self, max_players: usize) -> Self {
        self.config.room = RoomConfig { max_players };
        self
    }

    /// Closes connections that stay silent longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<RoomcastServer, RoomcastError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let state = Arc::new(ServerState::new(self.config));
        Ok(RoomcastServer { transport, state })
    }
}

impl Default for RoomcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Roomcast server whose listener is already bound.
///
/// Nothing is accepted until [`run()`](Self::run) is awaited.
pub struct RoomcastServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl RoomcastServer {
    /// Shorthand for [`RoomcastServerBuilder::new`].
    pub fn builder() -> RoomcastServerBuilder {
        RoomcastServerBuilder::new()
    }

    /// The bound address, with the real port when 0 was requested.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle for inspecting the server while it runs.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Accepts clients forever, one task per connection.
    ///
    /// The WebSocket upgrade runs in the spawned task, so a client that
    /// never sends its upgrade request holds up nobody else. Accept
    /// failures are logged and skipped; they never stop the loop.
    pub async fn run(mut self) -> Result<(), RoomcastError> {
        tracing::info!(
            max_players = self.state.config.room.max_players,
            idle_timeout_secs = ?self.state.config.idle_timeout_secs,
            "Roomcast server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let conn_id = incoming.id();
                    let task = handle_connection(incoming, Arc::clone(&self.state));
                    tokio::spawn(async move {
                        if let Err(e) = task.await {
                            tracing::debug!(%conn_id, error = %e, "connection task failed");
                        }
                    });
                }
                Err(e) => tracing::error!(error = %e, "could not accept client"),
            }
        }
    }
}

/// Point-in-time counts of what the server is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyStats {
    /// Identified connections.
    pub connections: usize,
    /// Active rooms.
    pub rooms: usize,
}

/// Read-only view of a running server, for operators and tests.
#[derive(Clone)]
pub struct ServerHandle {
    state: Arc<ServerState>,
}

impl ServerHandle {
    /// Returns current connection and room counts.
    pub async fn stats(&self) -> LobbyStats {
        let lobby = self.state.lobby.lock().await;
        LobbyStats {
            connections: lobby.registry.len(),
            rooms: lobby.directory.room_count(),
        }
    }

    /// Returns every active room with its occupancy.
    pub async fn rooms(&self) -> Vec<RoomListEntry> {
        self.state.lobby.lock().await.directory.list_rooms()
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}
