//! Events posted to the hub inbox.

use std::collections::BTreeMap;

use hubchat_protocol::{ChannelName, CommandKind, Handle, Request};
use hubchat_session::{ClientRef, SessionError};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One parsed client request, stamped with who sent it.
///
/// `sender` is the client's handle at the moment the handler read the
/// line (`None` while unregistered). The hub still checks it against its
/// own user map before acting on it.
#[derive(Debug, Clone)]
pub struct Command {
    request: Request,
    sender: Option<Handle>,
    client: ClientRef,
}

impl Command {
    pub fn new(request: Request, sender: Option<Handle>, client: ClientRef) -> Self {
        Self {
            request,
            sender,
            client,
        }
    }

    /// Builds a command stamped with the client's current handle.
    pub fn from_client(request: Request, client: &ClientRef) -> Self {
        Self::new(request, client.handle(), client.clone())
    }

    pub fn kind(&self) -> CommandKind {
        self.request.kind()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn sender(&self) -> Option<&Handle> {
        self.sender.as_ref()
    }

    /// The client that sent the command. Replies go here.
    pub fn client(&self) -> &ClientRef {
        &self.client
    }
}

// ---------------------------------------------------------------------------
// HubEvent
// ---------------------------------------------------------------------------

/// Everything the hub inbox carries.
///
/// Events with a `reply` channel are request/response: the caller awaits
/// the `oneshot` after posting. The rest are fire-and-forget.
#[derive(Debug)]
pub enum HubEvent {
    /// Claim `handle` for `client`.
    Register {
        client: ClientRef,
        handle: Handle,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// The client's connection is gone; drop it everywhere.
    Deregister { client: ClientRef },

    /// Any request other than `REG`.
    Command(Command),

    /// Read-only view of hub state.
    Snapshot { reply: oneshot::Sender<HubSnapshot> },

    /// Tell every registered client the server is going away, then stop.
    Shutdown,
}

/// Registered users and channel membership at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    /// Registered handles, sorted.
    pub users: Vec<Handle>,
    /// Every channel ever joined, with its current members sorted.
    pub channels: BTreeMap<ChannelName, Vec<Handle>>,
}

impl HubSnapshot {
    /// Members of `channel`, or `None` if it was never created.
    pub fn members(&self, channel: &ChannelName) -> Option<&[Handle]> {
        self.channels.get(channel).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubchat_transport::ConnectionId;

    fn client() -> ClientRef {
        ClientRef::with_queue(ConnectionId::new(1), 1).0
    }

    #[test]
    fn test_from_client_stamps_current_handle() {
        let client = client();
        let before = Command::from_client(Request::ListUsers, &client);
        client.assign_handle(Handle::parse("@alice").unwrap());
        let after = Command::from_client(Request::ListUsers, &client);

        assert_eq!(before.sender(), None);
        assert_eq!(after.sender().map(Handle::as_str), Some("@alice"));
        assert_eq!(after.kind(), CommandKind::ListUsers);
        assert_eq!(after.client().id(), client.id());
    }
}
