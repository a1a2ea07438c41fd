//! The hub's handle on one connected client.
//!
//! A [`ClientRef`] is created by the connection handler when a connection
//! is accepted and cloned into every hub event the handler posts. The hub
//! keeps clones in its user map and channel member sets. None of those
//! clones own the socket: all a `ClientRef` can do is push a
//! [`ServerMessage`] onto the client's outbound queue, which the client's
//! writer task drains onto the connection.
//!
//! # The handle cell
//!
//! The client's handle is written by the hub (on successful or rejected
//! registration) and read by the handler (to stamp the sender on each
//! command). That is a single-writer/multiple-reader field shared across
//! tasks, so it sits behind an `RwLock`. The lock is only held for a
//! clone or an assignment, never across an `.await`.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use hubchat_protocol::{Handle, ServerMessage};
use hubchat_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Sending end of a client's outbound queue.
pub type OutboundSender = mpsc::Sender<ServerMessage>;

/// Receiving end of a client's outbound queue, owned by its writer task.
pub type OutboundReceiver = mpsc::Receiver<ServerMessage>;

/// Cheaply cloneable reference to a connected client.
#[derive(Clone)]
pub struct ClientRef {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    id: ConnectionId,
    handle: RwLock<Option<Handle>>,
    outbound: OutboundSender,
}

impl ClientRef {
    /// Creates an unregistered client that delivers through `outbound`.
    pub fn new(id: ConnectionId, outbound: OutboundSender) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                id,
                handle: RwLock::new(None),
                outbound,
            }),
        }
    }

    /// Creates a client along with a fresh outbound queue of `capacity`
    /// messages.
    pub fn with_queue(
        id: ConnectionId,
        capacity: usize,
    ) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(id, tx), rx)
    }

    /// Returns the connection id, unique for the life of the process.
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Returns the client's handle, or `None` while unregistered.
    pub fn handle(&self) -> Option<Handle> {
        self.inner
            .handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records a successful registration. Only the hub calls this.
    pub fn assign_handle(&self, handle: Handle) {
        *self
            .inner
            .handle
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Clears the handle so the client can retry registration. Only the
    /// hub calls this.
    pub fn reset_handle(&self) {
        *self
            .inner
            .handle
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Enqueues a message for this client without waiting.
    ///
    /// Returns `false` if the message was dropped: either the queue is
    /// full (the client is not reading fast enough) or the writer task is
    /// gone (the connection closed). Neither case is reported to the
    /// sender of the message.
    pub fn send(&self, message: ServerMessage) -> bool {
        match self.inner.outbound.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.inner.id,
                    "outbound queue full, dropping message"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    conn_id = %self.inner.id,
                    "outbound queue closed, dropping message"
                );
                false
            }
        }
    }
}

impl fmt::Debug for ClientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRef")
            .field("id", &self.inner.id)
            .field("handle", &self.handle())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: &str) -> Handle {
        Handle::parse(raw).expect("valid handle")
    }

    #[test]
    fn test_new_client_is_unregistered() {
        let (client, _rx) = ClientRef::with_queue(ConnectionId::new(1), 4);
        assert_eq!(client.id(), ConnectionId::new(1));
        assert!(client.handle().is_none());
    }

    #[test]
    fn test_assign_and_reset_handle_visible_through_clones() {
        let (client, _rx) = ClientRef::with_queue(ConnectionId::new(1), 4);
        let other = client.clone();

        client.assign_handle(handle("@alice"));
        assert_eq!(other.handle(), Some(handle("@alice")));

        other.reset_handle();
        assert!(client.handle().is_none());
    }

    #[test]
    fn test_send_delivers_in_order() {
        let (client, mut rx) = ClientRef::with_queue(ConnectionId::new(1), 4);
        assert!(client.send(ServerMessage::Registered));
        assert!(client.send(ServerMessage::RegisterFirst));

        assert_eq!(rx.try_recv().ok(), Some(ServerMessage::Registered));
        assert_eq!(rx.try_recv().ok(), Some(ServerMessage::RegisterFirst));
    }

    #[test]
    fn test_send_full_queue_drops_without_blocking() {
        let (client, mut rx) = ClientRef::with_queue(ConnectionId::new(1), 1);
        assert!(client.send(ServerMessage::Registered));
        assert!(!client.send(ServerMessage::RegisterFirst));

        assert_eq!(rx.try_recv().ok(), Some(ServerMessage::Registered));
        assert!(rx.try_recv().is_err(), "second message was dropped");
    }

    #[test]
    fn test_send_after_receiver_dropped_returns_false() {
        let (client, rx) = ClientRef::with_queue(ConnectionId::new(1), 4);
        drop(rx);
        assert!(!client.send(ServerMessage::Registered));
    }
}
