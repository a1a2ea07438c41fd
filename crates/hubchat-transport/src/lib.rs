//! Transport abstraction layer for hubchat.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the byte streams a chat session runs on. The hub never sees a socket:
//! the server accepts a [`Connection`], splits it into a read half and a
//! write half, and hands each half to its own task.
//!
//! # Feature Flags
//!
//! - `tcp` (default) — plain TCP transport via `tokio::net`

#![allow(async_fn_in_trait)]

mod error;
mod memory;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
pub use memory::MemoryConnection;
#[cfg(feature = "tcp")]
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};

/// Counter for generating unique connection IDs, shared by every transport
/// so ids never collide inside one process.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A single accepted byte stream.
///
/// A connection is consumed by [`into_split`](Connection::into_split): the
/// read half goes to the client handler's read loop and the write half to
/// the client's writer task, so a slow reader never holds up writes and
/// vice versa.
pub trait Connection: Send + 'static {
    /// Read half of the stream.
    type Reader: AsyncRead + Send + Unpin + 'static;
    /// Write half of the stream.
    type Writer: AsyncWrite + Send + Unpin + 'static;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote address, when the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Splits the connection into independently owned halves.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b > a, "ids are allocated in increasing order");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
