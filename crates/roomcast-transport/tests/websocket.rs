//! Loopback tests for the WebSocket transport: a real listener on an
//! ephemeral port, driven by a bare `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use roomcast_transport::{
        Connection, Incoming, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn dial(addr: SocketAddr) -> Client {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client connects");
        ws
    }

    /// One accepted server-side connection and the client that opened it.
    async fn pair() -> (WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("bind");
        let addr = transport.local_addr().expect("local addr");
        let accepted = tokio::spawn(async move {
            let incoming = transport.accept().await.expect("accept");
            incoming.upgrade().await.expect("upgrade")
        });
        let client = dial(addr).await;
        (accepted.await.expect("accept task"), client)
    }

    async fn next_text(client: &mut Client) -> String {
        let msg = client.next().await.expect("frame").expect("readable");
        msg.into_text().expect("text frame").as_str().to_owned()
    }

    #[tokio::test]
    async fn test_text_frames_flow_both_ways() {
        let (conn, mut client) = pair().await;

        conn.send("PID###0").await.expect("send");
        assert_eq!(next_text(&mut client).await, "PID###0");

        client.send(Message::text("Get ID")).await.expect("client send");
        assert_eq!(conn.recv().await.expect("recv").as_deref(), Some("Get ID"));

        conn.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_ids_follow_accept_order() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("bind");
        let addr = transport.local_addr().expect("local addr");
        let clients = tokio::spawn(async move { (dial(addr).await, dial(addr).await) });

        let first = transport.accept().await.expect("first accept");
        let first = first.upgrade().await.expect("first upgrade");
        let second = transport.accept().await.expect("second accept");
        let second = second.upgrade().await.expect("second upgrade");
        let _clients = clients.await.expect("dial task");

        assert_eq!(first.id().into_inner(), 1);
        assert_eq!(second.id().into_inner(), 2);
    }

    #[tokio::test]
    async fn test_accept_returns_before_the_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("bind");
        let addr = transport.local_addr().expect("local addr");
        let _silent = tokio::net::TcpStream::connect(addr).await.expect("tcp connect");

        let incoming = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept does not wait for the upgrade request")
            .expect("accept");
        assert_eq!(incoming.id().into_inner(), 1);
        assert!(incoming.peer_addr().ip().is_loopback());

        let stalled = tokio::time::timeout(Duration::from_millis(100), incoming.upgrade()).await;
        assert!(stalled.is_err(), "upgrade waits for the client");
    }

    #[tokio::test]
    async fn test_peer_addr_is_loopback() {
        let (conn, _client) = pair().await;
        let peer = conn.peer_addr().expect("websocket knows its peer");
        assert!(peer.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_binary_frame_with_utf8_reads_as_text() {
        let (conn, mut client) = pair().await;

        client
            .send(Message::Binary(b"See rooms".to_vec().into()))
            .await
            .expect("client send");
        assert_eq!(conn.recv().await.expect("recv").as_deref(), Some("See rooms"));
    }

    #[tokio::test]
    async fn test_binary_frame_with_bad_utf8_is_rejected() {
        let (conn, mut client) = pair().await;

        client
            .send(Message::Binary(vec![0xc3, 0x28].into()))
            .await
            .expect("client send");
        assert!(matches!(conn.recv().await, Err(TransportError::InvalidFrame(_))));
    }

    #[tokio::test]
    async fn test_ping_is_skipped_before_next_text() {
        let (conn, mut client) = pair().await;

        client.send(Message::Ping(Vec::new().into())).await.expect("ping");
        client.send(Message::text("Leave Room")).await.expect("text");
        assert_eq!(conn.recv().await.expect("recv").as_deref(), Some("Leave Room"));
    }

    #[tokio::test]
    async fn test_client_close_reads_as_end_of_stream() {
        let (conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.expect("client close");
        assert_eq!(conn.recv().await.expect("clean close"), None);
    }

    #[tokio::test]
    async fn test_parked_reader_leaves_sender_free() {
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        let reader = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.recv().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send("Start Game"))
            .await
            .expect("send finishes while a read is pending")
            .expect("send");
        assert_eq!(next_text(&mut client).await, "Start Game");

        client.send(Message::text("12345")).await.expect("client send");
        let got = reader.await.expect("reader task").expect("recv");
        assert_eq!(got.as_deref(), Some("12345"));
    }
}
