/// Failures below the protocol: sockets, frames and handshakes.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away mid-exchange.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A binary frame that is not UTF-8.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Client side: dialing or upgrading failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Server side: binding, accepting or upgrading failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The client did not finish its handshake in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),
}
