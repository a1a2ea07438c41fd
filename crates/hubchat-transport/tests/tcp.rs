//! Integration tests for the TCP transport.
//!
//! These tests spin up a real listener on an OS-assigned port and connect
//! a plain `TcpStream` client to it, verifying that both halves of a split
//! connection carry bytes.

#[cfg(feature = "tcp")]
mod tcp {
    use hubchat_transport::{Connection, TcpTransport, Transport};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_tcp_accept_and_split_roundtrip() {
        // "127.0.0.1:0" tells the OS to pick an available port.
        let mut transport = TcpTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client =
            TcpStream::connect(addr).await.expect("client should connect");
        let conn = server.await.expect("task should complete");

        assert!(conn.id().into_inner() > 0);
        let peer = conn.peer_addr().expect("tcp has a peer address");
        assert_eq!(peer, client.local_addr().expect("client addr"));

        let (reader, mut writer) = conn.into_split();
        let mut reader = BufReader::new(reader);

        client.write_all(b"REG @alice\n").await.expect("client write");
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("server read");
        assert_eq!(line, "REG @alice\n");

        writer
            .write_all(b"Registered successfully\n")
            .await
            .expect("server write");
        let mut client = BufReader::new(client);
        line.clear();
        client.read_line(&mut line).await.expect("client read");
        assert_eq!(line, "Registered successfully\n");
    }

    #[tokio::test]
    async fn test_tcp_accept_assigns_distinct_ids() {
        let mut transport = TcpTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let _a = TcpStream::connect(addr).await.expect("connect a");
        let first = transport.accept().await.expect("accept a");
        let _b = TcpStream::connect(addr).await.expect("connect b");
        let second = transport.accept().await.expect("accept b");

        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_tcp_bind_invalid_address_fails() {
        let result = TcpTransport::bind("not-an-address").await;
        assert!(result.is_err());
    }
}
