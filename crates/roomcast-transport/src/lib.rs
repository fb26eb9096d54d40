//! Transport layer for Roomcast.
//!
//! Roomcast speaks one text token per frame. This crate hides where the
//! frames come from behind three traits: a [`Transport`] accepts raw
//! [`Incoming`] sockets, each one is upgraded into a [`Connection`], and
//! a connection moves text in both directions.
//!
//! Accepting and upgrading are separate steps so a client that stalls
//! its handshake only holds up its own task, never the accept loop.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{IncomingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Names one accepted socket in logs.
///
/// Assigned at accept time, before the client has asked for a player
/// identity, so early failures can still be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// What [`accept`](Self::accept) yields.
    type Incoming: Incoming;
    /// Accept failure.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client socket. Does no protocol handshake, so
    /// it returns as soon as the OS hands over the socket.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;
}

/// An accepted socket that has not finished its handshake yet.
pub trait Incoming: Send + 'static {
    /// What a successful [`upgrade`](Self::upgrade) yields.
    type Connection: Connection;
    /// Handshake failure.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake. Callers bound this with a timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;

    /// The id assigned at accept time.
    fn id(&self) -> ConnectionId;

    /// The remote address.
    fn peer_addr(&self) -> SocketAddr;
}

/// One client's bidirectional text channel.
///
/// Send and receive take `&self` and must work concurrently from
/// different tasks: a reader parked in [`recv`](Self::recv) must never
/// hold up a writer.
pub trait Connection: Send + Sync + 'static {
    /// Send or receive failure.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame.
    async fn send(&self, text: &str) -> Result<(), Self::Error>;

    /// Waits for the next text frame.
    ///
    /// `Ok(None)` means the peer closed the connection cleanly.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    /// The id assigned at accept time.
    fn id(&self) -> ConnectionId;

    /// The remote address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display_is_log_friendly() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_round_trips_raw_value() {
        assert_eq!(ConnectionId::new(42).into_inner(), 42);
    }

    #[test]
    fn test_connection_ids_order_by_accept_sequence() {
        let mut ids = vec![
            ConnectionId::new(3),
            ConnectionId::new(1),
            ConnectionId::new(2),
        ];
        ids.sort();
        let raw: Vec<u64> = ids.into_iter().map(ConnectionId::into_inner).collect();
        assert_eq!(raw, vec![1, 2, 3]);
    }
}
