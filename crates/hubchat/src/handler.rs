//! Per-connection handler: the client protocol state machine.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Split the connection; spawn a writer task that drains the client's
//!      outbound queue onto the write half
//!   2. Loop: read one request, post it to the hub, repeat
//!   3. On EOF or a read error, deregister (via a drop guard)
//!
//! The handler never touches hub state. Everything the client sees comes
//! out of its outbound queue, whether it was put there by the hub or by
//! the handler rejecting a malformed line.

use std::sync::Arc;

use hubchat_hub::{Command, HubError, HubHandle};
use hubchat_protocol::{LineCodec, Request, ServerMessage};
use hubchat_session::{ClientRef, OutboundReceiver};
use hubchat_transport::{Connection, ConnectionId};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::HubchatError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) hub: HubHandle,
    pub(crate) codec: LineCodec,
    pub(crate) outbound_capacity: usize,
}

/// Drop guard that deregisters the client when the handler exits.
///
/// This ensures cleanup happens on every exit path, including panics.
/// Since `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async post.
struct DeregisterGuard {
    client: ClientRef,
    hub: HubHandle,
}

impl Drop for DeregisterGuard {
    fn drop(&mut self) {
        let client = self.client.clone();
        let hub = self.hub.clone();
        tokio::spawn(async move {
            if let Err(e) = hub.deregister(client).await {
                tracing::debug!(error = %e, "deregistration not delivered");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    state: Arc<ServerState>,
) -> Result<(), HubchatError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    let (reader, writer) = conn.into_split();
    let (client, outbound) = ClientRef::with_queue(conn_id, state.outbound_capacity);
    tokio::spawn(write_loop(conn_id, writer, outbound, state.codec));

    let _guard = DeregisterGuard {
        client: client.clone(),
        hub: state.hub.clone(),
    };

    let mut reader = BufReader::new(reader);
    read_loop(&mut reader, &client, &state).await
    // _guard drops here → deregistration fires.
}

/// Reads requests until the stream ends.
async fn read_loop<R>(
    reader: &mut R,
    client: &ClientRef,
    state: &ServerState,
) -> Result<(), HubchatError>
where
    R: AsyncBufRead + Unpin,
{
    let conn_id = client.id();
    loop {
        let request = match state.codec.read_request(reader).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                return Ok(());
            }
            Err(e) if e.is_recoverable() => {
                tracing::debug!(%conn_id, error = %e, "rejected command");
                client.send(ServerMessage::Error(e.to_string()));
                continue;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "read failed");
                return Err(e.into());
            }
        };

        tracing::debug!(%conn_id, command = %request.kind(), "received command");
        dispatch(request, client, &state.hub).await?;
    }
}

/// Posts one request to the hub.
///
/// Registration waits for the hub's verdict so the next command is
/// stamped with the new handle. A refused registration has already been
/// reported to the client and does not end the session.
async fn dispatch(
    request: Request,
    client: &ClientRef,
    hub: &HubHandle,
) -> Result<(), HubError> {
    match request {
        Request::Register { handle } => match hub.register(client.clone(), handle).await {
            Ok(()) | Err(HubError::Rejected(_)) => Ok(()),
            Err(e) => Err(e),
        },
        other => hub.submit(Command::from_client(other, client)).await,
    }
}

/// Drains the outbound queue onto the socket until every sender is gone
/// or a write fails.
async fn write_loop<W>(
    conn_id: ConnectionId,
    mut writer: W,
    mut outbound: OutboundReceiver,
    codec: LineCodec,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let bytes = codec.encode(&message);
        if let Err(e) = writer.write_all(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "write failed");
            return;
        }
        if let Err(e) = writer.flush().await {
            tracing::debug!(%conn_id, error = %e, "flush failed");
            return;
        }
    }

    let _ = writer.shutdown().await;
    tracing::debug!(%conn_id, "writer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use hubchat_hub::{FixedClock, HubConfig, spawn_hub};
    use hubchat_protocol::{FrameLimits, Handle};
    use hubchat_transport::MemoryConnection;
    use tokio::io::{AsyncBufReadExt, DuplexStream, ReadHalf, WriteHalf};

    const TS: &str = "2024-01-01 00:00:00.000000";

    struct TestClient {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl TestClient {
        async fn send(&mut self, raw: &[u8]) {
            self.writer.write_all(raw).await.unwrap();
        }

        async fn line(&mut self) -> String {
            let mut line = String::new();
            tokio::time::timeout(Duration::from_secs(1), self.reader.read_line(&mut line))
                .await
                .expect("timed out waiting for line")
                .unwrap();
            line
        }
    }

    fn state(limits: FrameLimits) -> Arc<ServerState> {
        Arc::new(ServerState {
            hub: spawn_hub(HubConfig::default(), Arc::new(FixedClock::new(TS))),
            codec: LineCodec::new(limits),
            outbound_capacity: 16,
        })
    }

    fn connect(state: &Arc<ServerState>) -> TestClient {
        let (conn, remote) = MemoryConnection::pair(4096);
        tokio::spawn(handle_connection(conn, Arc::clone(state)));
        let (reader, writer) = tokio::io::split(remote);
        TestClient {
            reader: BufReader::new(reader),
            writer,
        }
    }

    #[tokio::test]
    async fn test_handler_register_replies_registered() {
        let state = state(FrameLimits::default());
        let mut client = connect(&state);

        client.send(b"REG @alice\r\n").await;

        assert_eq!(client.line().await, "Registered successfully\n");
    }

    #[tokio::test]
    async fn test_handler_unknown_command_keeps_session_open() {
        let state = state(FrameLimits::default());
        let mut client = connect(&state);

        client.send(b"DANCE\r\n").await;
        assert_eq!(client.line().await, "ERR unknown command: DANCE\n");

        client.send(b"REG @alice\r\n").await;
        assert_eq!(client.line().await, "Registered successfully\n");
    }

    #[tokio::test]
    async fn test_handler_command_after_register_uses_new_handle() {
        let state = state(FrameLimits::default());
        let mut client = connect(&state);

        // No waiting between lines: JOIN must still see the registration.
        client.send(b"REG @alice\r\nJOIN #general\r\n").await;

        assert_eq!(client.line().await, "Registered successfully\n");
        assert_eq!(client.line().await, format!("{TS}: Joined channel #general\n"));
    }

    #[tokio::test]
    async fn test_handler_oversize_body_rejected_and_stream_resyncs() {
        let state = state(FrameLimits {
            max_line_len: 64,
            max_body_len: 4,
        });
        let mut client = connect(&state);

        client.send(b"REG @alice\r\n").await;
        assert_eq!(client.line().await, "Registered successfully\n");

        client.send(b"MSG @alice 10\r\n0123456789CHNS\r\n").await;
        assert_eq!(
            client.line().await,
            "ERR body length 10 exceeds limit of 4 bytes\n"
        );
        assert_eq!(client.line().await, "No channels available\n");
    }

    #[tokio::test]
    async fn test_handler_bad_recipient_body_is_not_run_as_commands() {
        let state = state(FrameLimits::default());
        let mut client = connect(&state);
        client.send(b"REG @alice\r\n").await;
        assert_eq!(client.line().await, "Registered successfully\n");

        client.send(b"MSG bob 10\r\nJOIN #evil\r\nUSRS\r\n").await;

        assert_eq!(
            client.line().await,
            "ERR invalid recipient: bob. Must be a channel ('#name') or user ('@user')\n"
        );
        assert_eq!(client.line().await, "@alice\n");
        assert!(state.hub.snapshot().await.unwrap().channels.is_empty());
    }

    #[tokio::test]
    async fn test_handler_eof_deregisters_client() {
        let state = state(FrameLimits::default());
        let mut client = connect(&state);
        client.send(b"REG @alice\r\n").await;
        assert_eq!(client.line().await, "Registered successfully\n");

        drop(client);

        let hub = state.hub.clone();
        let freed = tokio::time::timeout(Duration::from_secs(1), async move {
            loop {
                if hub.snapshot().await.unwrap().users.is_empty() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(freed.is_ok(), "handle should be released after EOF");

        // The handle can be claimed again.
        let mut again = connect(&state);
        again.send(b"REG @alice\r\n").await;
        assert_eq!(again.line().await, "Registered successfully\n");
        assert_eq!(
            state.hub.snapshot().await.unwrap().users,
            vec![Handle::parse("@alice").unwrap()]
        );
    }
}
