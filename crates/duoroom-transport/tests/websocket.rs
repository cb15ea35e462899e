//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a plain `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use duoroom_transport::{
        Connection, PendingConnection, Transport, WebSocketConnection,
        WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    /// Binds on port 0 and returns the transport plus its real address.
    async fn bind_any() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound addr").to_string();
        (transport, addr)
    }

    /// Accepts the next peer and completes its handshake.
    async fn accept_upgraded(transport: &mut WebSocketTransport) -> WebSocketConnection {
        let pending = transport.accept().await.expect("should accept");
        pending.upgrade().await.expect("handshake should complete")
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().to_string().starts_with("conn-"));

        server_conn
            .send(br#"{"type":"hello"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "utf-8 payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"hello"}"#);

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_received_as_bytes() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws
            .send(Message::Text(r#"{"type":"reset"}"#.into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, br#"{"type":"reset"}"#);
    }

    #[tokio::test]
    async fn test_websocket_send_does_not_wait_for_pending_recv() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = Arc::new(server_handle.await.unwrap());

        // Park a receive on the connection; nothing will arrive for it.
        let reader = Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(2), server_conn.send(b"push"))
            .await
            .expect("send must not block behind recv")
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"push");

        pending.abort();
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_accept_does_not_wait_for_handshake() {
        let (mut transport, addr) = bind_any().await;

        // A peer that opens TCP and never sends the upgrade request.
        let _stalled = tokio::net::TcpStream::connect(&addr)
            .await
            .expect("raw connect");
        let stalled = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept must return before the handshake")
            .expect("should accept");

        let server_handle =
            tokio::spawn(async move { accept_upgraded(&mut transport).await });
        let _client_ws = tokio::time::timeout(
            Duration::from_secs(2),
            connect_client(&addr),
        )
        .await
        .expect("second client must not wait on the stalled one");
        let server_conn = server_handle.await.unwrap();

        assert_ne!(server_conn.id(), stalled.id());
    }

    #[tokio::test]
    async fn test_websocket_upgrade_fails_on_garbage() {
        use tokio::io::AsyncWriteExt;

        let (mut transport, addr) = bind_any().await;
        let mut raw = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let pending = transport.accept().await.unwrap();

        raw.write_all(b"definitely not http\r\n\r\n").await.unwrap();
        let result = pending.upgrade().await;
        assert!(matches!(
            result,
            Err(duoroom_transport::TransportError::HandshakeFailed { .. })
        ));
    }
}
