//! WebSocket transport on `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::{Connection, ConnectionId, Incoming, Transport, TransportError};

type WsStream = WebSocketStream<TcpStream>;

/// Listens for WebSocket clients on a TCP port.
pub struct WebSocketTransport {
    listener: TcpListener,
    next_connection_id: u64,
}

impl WebSocketTransport {
    /// Binds the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            next_connection_id: 1,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Incoming = IncomingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<IncomingWebSocket, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // Counted before the upgrade so a failed handshake still burns
        // an id and shows up in the logs.
        let id = ConnectionId::new(self.next_connection_id);
        self.next_connection_id += 1;
        tracing::trace!(%id, %peer, "accepted TCP socket");

        Ok(IncomingWebSocket { id, peer, stream })
    }
}

/// A TCP socket waiting for its WebSocket upgrade request.
pub struct IncomingWebSocket {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
}

impl Incoming for IncomingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self { id, peer, stream } = self;
        let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
            tracing::debug!(%id, %peer, error = %e, "WebSocket upgrade failed");
            TransportError::AcceptFailed(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// An upgraded WebSocket.
///
/// Split into a sink and a stream, each behind its own lock, so the
/// writer task keeps sending while the reader waits for input.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

fn write_error(e: tungstenite::Error) -> TransportError {
    TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e))
}

fn read_error(e: tungstenite::Error) -> TransportError {
    TransportError::ReceiveFailed(io::Error::new(io::ErrorKind::ConnectionReset, e))
}

/// Extracts the text of a data frame. Control frames yield `None`.
fn frame_text(msg: Message) -> Option<Result<String, TransportError>> {
    match msg {
        Message::Text(text) => Some(Ok(text.as_str().to_owned())),
        Message::Binary(data) => Some(
            String::from_utf8(data.to_vec())
                .map_err(|e| TransportError::InvalidFrame(e.to_string())),
        ),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) | Message::Close(_) => None,
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_owned()))
            .await
            .map_err(write_error)
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            let msg = frame.map_err(read_error)?;
            if msg.is_close() {
                break;
            }
            if let Some(text) = frame_text(msg) {
                return text.map(Some);
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink.lock().await.close().await.map_err(write_error)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}
