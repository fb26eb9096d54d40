//! Per-connection handler: writer task, request loop, and cleanup.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   0. Finish the WebSocket upgrade, bounded by [`UPGRADE_TIMEOUT`]
//!   1. Spawn a writer task draining the connection's outbox
//!   2. Run the protocol engine until close, exit, error or timeout
//!   3. Release the player (leave room, unregister)
//!   4. Let the writer flush, then close the socket

use std::sync::Arc;
use std::time::Duration;

use roomcast_session::OutboxReceiver;
use roomcast_transport::{
    Connection, Incoming, IncomingWebSocket, TransportError, WebSocketConnection,
};

use crate::engine::ConnectionEngine;
use crate::server::ServerState;
use crate::RoomcastError;

/// How long a fresh socket gets to send its upgrade request.
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the writer gets to flush queued text after cleanup.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    incoming: IncomingWebSocket,
    state: Arc<ServerState>,
) -> Result<(), RoomcastError> {
    let conn_id = incoming.id();
    let conn = tokio::time::timeout(UPGRADE_TIMEOUT, incoming.upgrade())
        .await
        .map_err(|_| TransportError::HandshakeTimeout(UPGRADE_TIMEOUT))??;
    let conn = Arc::new(conn);
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    let (outbox, outbox_rx) = roomcast_session::outbox();
    let mut writer = tokio::spawn(write_loop(Arc::clone(&conn), outbox_rx));

    let mut engine = ConnectionEngine::new(Arc::clone(&conn), outbox, state);
    let result = engine.run().await;
    engine.release().await;
    // Drops the last outbox sender, so the writer stops once drained.
    drop(engine);

    if tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        tracing::warn!(%conn_id, "writer did not finish, aborting");
        writer.abort();
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }

    match &result {
        Ok(()) => tracing::info!(%conn_id, "connection closed"),
        Err(e) => tracing::info!(%conn_id, error = %e, "connection dropped"),
    }
    result
}

/// Forwards queued text to the socket, in order, until every outbox
/// sender is gone or the socket fails.
async fn write_loop(conn: Arc<WebSocketConnection>, mut outbox_rx: OutboxReceiver) {
    while let Some(text) = outbox_rx.recv().await {
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed");
            break;
        }
    }
}
