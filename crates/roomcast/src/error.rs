//! Unified error type for the Roomcast server.

use std::path::PathBuf;

use roomcast_protocol::ProtocolError;
use roomcast_room::RoomError;
use roomcast_session::SessionError;
use roomcast_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomcastError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A malformed answer or reply.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry lookup failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, membership).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ConfigIo {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ServerConfig`](crate::ServerConfig).
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
