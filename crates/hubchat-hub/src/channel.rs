//! Chat rooms.

use std::collections::HashMap;

use hubchat_protocol::{ChannelName, Handle, ServerMessage};
use hubchat_session::ClientRef;
use hubchat_transport::ConnectionId;

/// A named room and the clients currently in it.
///
/// Membership is a set keyed by connection id, so joining twice or leaving
/// a room you are not in are both no-ops.
#[derive(Debug)]
pub struct Channel {
    name: ChannelName,
    members: HashMap<ConnectionId, ClientRef>,
}

impl Channel {
    pub fn new(name: ChannelName) -> Self {
        Self {
            name,
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Adds a member. Returns `false` if it was already present.
    pub fn join(&mut self, client: &ClientRef) -> bool {
        self.members.insert(client.id(), client.clone()).is_none()
    }

    /// Removes a member. Returns `false` if it was not present.
    pub fn leave(&mut self, id: ConnectionId) -> bool {
        self.members.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Handles of the current members, sorted.
    pub fn member_handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> =
            self.members.values().filter_map(ClientRef::handle).collect();
        handles.sort();
        handles
    }

    /// Queues one chat line for every member, the sender included.
    ///
    /// Delivery is best effort. Returns how many members accepted the
    /// message into their queue.
    pub fn broadcast(&self, sender: &Handle, at: &str, body: &[u8]) -> usize {
        let mut delivered = 0;
        for member in self.members.values() {
            let line = ServerMessage::Chat {
                at: at.to_string(),
                sender: sender.clone(),
                body: body.to_vec(),
            };
            if member.send(line) {
                delivered += 1;
            }
        }
        delivered
    }
}
