//! In-process connection backed by `tokio::io::duplex`.
//!
//! Lets the client handler run against a pipe instead of a socket, which
//! keeps handler tests fast and free of port allocation.

use std::net::SocketAddr;

use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

use crate::{Connection, ConnectionId};

/// One end of an in-memory duplex pipe, usable as a [`Connection`].
pub struct MemoryConnection {
    id: ConnectionId,
    stream: DuplexStream,
}

impl MemoryConnection {
    /// Creates a connection plus the peer end of the pipe.
    ///
    /// Whatever is written to the returned `DuplexStream` is read by the
    /// connection, and vice versa. `buffer` bounds the bytes in flight per
    /// direction.
    pub fn pair(buffer: usize) -> (Self, DuplexStream) {
        let (local, remote) = tokio::io::duplex(buffer);
        let conn = Self {
            id: ConnectionId::next(),
            stream: local,
        };
        (conn, remote)
    }
}

impl Connection for MemoryConnection {
    type Reader = ReadHalf<DuplexStream>;
    type Writer = WriteHalf<DuplexStream>;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        tokio::io::split(self.stream)
    }
}
