//! Hub state and the rules for every chat operation.
//!
//! [`Hub`] is plain synchronous state: the user registry, the channel map,
//! and a clock. It never awaits. The actor in [`crate::actor`] owns one
//! `Hub` and feeds it events one at a time, which is what makes each
//! operation atomic with respect to every other.
//!
//! Replies never go through a return value. Each operation pushes
//! [`ServerMessage`]s onto the relevant clients' outbound queues, and the
//! clients' writer tasks put them on the wire.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use hubchat_protocol::{ChannelName, Handle, Recipient, Request, ServerMessage};
use hubchat_session::{ClientRef, Registry, SessionError};

use crate::channel::Channel;
use crate::clock::Clock;
use crate::command::{Command, HubEvent, HubSnapshot};

/// Reason sent to every registered client when the hub stops.
pub const SHUTDOWN_NOTICE: &str = "server shutting down";

/// Reason sent when an unregistered client tries to `MSG`.
pub const NOT_REGISTERED: &str = "user not registered";

/// The authoritative chat state.
pub struct Hub {
    users: Registry,
    channels: BTreeMap<ChannelName, Channel>,
    clock: Arc<dyn Clock>,
}

impl Hub {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Registry::new(),
            channels: BTreeMap::new(),
            clock,
        }
    }

    /// Applies one inbox event.
    ///
    /// Returns `ControlFlow::Break` after a shutdown event; the caller
    /// should stop feeding events.
    pub fn handle_event(&mut self, event: HubEvent) -> ControlFlow<()> {
        match event {
            HubEvent::Register {
                client,
                handle,
                reply,
            } => {
                let result = self.register(&client, handle);
                // The caller may have stopped waiting.
                let _ = reply.send(result);
            }
            HubEvent::Deregister { client } => {
                self.deregister(&client);
            }
            HubEvent::Command(command) => self.dispatch(command),
            HubEvent::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            HubEvent::Shutdown => {
                self.shutdown_notice();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Routes a command to the operation for its kind.
    pub fn dispatch(&mut self, command: Command) {
        let client = command.client();
        let sender = command.sender();
        tracing::trace!(
            conn_id = %client.id(),
            kind = %command.kind(),
            "dispatching command"
        );
        match command.request() {
            Request::Register { handle } => {
                let _ = self.register(client, handle.clone());
            }
            Request::Join { channel } => self.join_channel(client, sender, channel),
            Request::Leave { channel } => self.leave_channel(client, sender, channel),
            Request::SendMessage { recipient, body } => {
                self.send_message(client, sender, recipient, body)
            }
            Request::ListChannels => self.list_channels(client, sender),
            Request::ListUsers => self.list_users(client, sender),
        }
    }

    /// Claims `handle` for `client` and tells the client how it went.
    ///
    /// A duplicate handle gets the error line plus a hint line, and the
    /// client's handle is reset so it can try again.
    pub fn register(&mut self, client: &ClientRef, handle: Handle) -> Result<(), SessionError> {
        match self.users.register(client, handle.clone()) {
            Ok(()) => {
                client.send(ServerMessage::Registered);
                tracing::info!(
                    conn_id = %client.id(),
                    %handle,
                    users = self.users.len(),
                    "user registered"
                );
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    conn_id = %client.id(),
                    %handle,
                    reason = %err,
                    "registration rejected"
                );
                client.send(ServerMessage::Error(err.to_string()));
                if matches!(err, SessionError::HandleTaken(_)) {
                    client.send(ServerMessage::HandleTakenHint);
                }
                Err(err)
            }
        }
    }

    /// Removes the client from the user map and from every channel.
    ///
    /// Returns the freed handle, or `None` (and does nothing) if the client
    /// was not registered.
    pub fn deregister(&mut self, client: &ClientRef) -> Option<Handle> {
        let handle = self.users.deregister(client)?;
        for channel in self.channels.values_mut() {
            channel.leave(client.id());
        }

        client.send(ServerMessage::Deregistered {
            at: self.clock.now(),
        });
        tracing::info!(
            conn_id = %client.id(),
            %handle,
            users = self.users.len(),
            "user deregistered"
        );
        Some(handle)
    }

    /// Adds the client to `name`, creating the channel on first join.
    pub fn join_channel(
        &mut self,
        client: &ClientRef,
        sender: Option<&Handle>,
        name: &ChannelName,
    ) {
        let Some(handle) = self.require_registered(client, sender) else {
            return;
        };

        let channel = self
            .channels
            .entry(name.clone())
            .or_insert_with(|| Channel::new(name.clone()));
        channel.join(client);
        let members = channel.len();

        client.send(ServerMessage::Joined {
            at: self.clock.now(),
            channel: name.clone(),
        });
        tracing::info!(%handle, channel = %name, members, "joined channel");
    }

    /// Removes the client from `name`. Leaving a channel that does not
    /// exist, or that the client is not in, still confirms.
    pub fn leave_channel(
        &mut self,
        client: &ClientRef,
        sender: Option<&Handle>,
        name: &ChannelName,
    ) {
        let Some(handle) = self.require_registered(client, sender) else {
            return;
        };

        if let Some(channel) = self.channels.get_mut(name) {
            channel.leave(client.id());
        }

        client.send(ServerMessage::Left {
            at: self.clock.now(),
            channel: name.clone(),
        });
        tracing::info!(%handle, channel = %name, "left channel");
    }

    /// Delivers a chat line to a channel's members or to one user.
    ///
    /// Routing misses are dropped without telling the sender: an unknown
    /// channel, a channel the sender is not in, or an unknown user.
    pub fn send_message(
        &self,
        client: &ClientRef,
        sender: Option<&Handle>,
        recipient: &Recipient,
        body: &[u8],
    ) {
        if sender.is_none() {
            client.send(ServerMessage::Error(NOT_REGISTERED.to_string()));
            client.send(ServerMessage::NotRegisteredHint);
            return;
        }
        let Some(sender) = self.users.resolve(client).cloned() else {
            tracing::debug!(conn_id = %client.id(), "stale sender, dropping message");
            return;
        };

        let at = self.clock.now();
        match recipient {
            Recipient::Channel(name) => match self.channels.get(name) {
                Some(channel) if channel.contains(client.id()) => {
                    let delivered = channel.broadcast(&sender, &at, body);
                    tracing::debug!(
                        %sender,
                        channel = %name,
                        delivered,
                        "broadcast message"
                    );
                }
                Some(_) => {
                    tracing::debug!(
                        %sender,
                        channel = %name,
                        "sender not a member, dropping message"
                    );
                }
                None => {
                    tracing::debug!(
                        %sender,
                        channel = %name,
                        "no such channel, dropping message"
                    );
                }
            },
            Recipient::User(target) => match self.users.get(target) {
                Some(user) => {
                    user.send(ServerMessage::Chat {
                        at,
                        sender: sender.clone(),
                        body: body.to_vec(),
                    });
                    tracing::debug!(%sender, recipient = %target, "direct message");
                }
                None => {
                    tracing::debug!(
                        %sender,
                        recipient = %target,
                        "unknown recipient, dropping message"
                    );
                }
            },
        }
    }

    /// Replies with every channel name, sorted.
    pub fn list_channels(&self, client: &ClientRef, sender: Option<&Handle>) {
        if self.require_registered(client, sender).is_none() {
            return;
        }
        let names = self.channels.keys().cloned().collect();
        client.send(ServerMessage::ChannelList(names));
    }

    /// Replies with every registered handle, sorted.
    ///
    /// The reply goes to the client registered under `sender`. Unregistered
    /// callers get nothing back.
    pub fn list_users(&self, client: &ClientRef, sender: Option<&Handle>) {
        let Some(owner) = sender.and_then(|handle| self.users.get(handle)) else {
            tracing::debug!(conn_id = %client.id(), "user listing from unregistered client");
            return;
        };
        if owner.id() != client.id() {
            return;
        }
        owner.send(ServerMessage::UserList(self.users.handles()));
    }

    pub fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            users: self.users.handles(),
            channels: self
                .channels
                .iter()
                .map(|(name, channel)| (name.clone(), channel.member_handles()))
                .collect(),
        }
    }

    /// Sends the shutdown notice to every registered client.
    pub fn shutdown_notice(&self) {
        tracing::info!(users = self.users.len(), "hub shutting down");
        for client in self.users.clients() {
            client.send(ServerMessage::Error(SHUTDOWN_NOTICE.to_string()));
        }
    }

    /// Checks both that the command was sent by a registered client and
    /// that the registration is still live.
    ///
    /// Unregistered clients are told to register first. A client whose
    /// registration has gone away in the meantime is ignored.
    fn require_registered(
        &self,
        client: &ClientRef,
        sender: Option<&Handle>,
    ) -> Option<Handle> {
        if sender.is_none() {
            client.send(ServerMessage::RegisterFirst);
            return None;
        }
        self.users.resolve(client).cloned()
    }
}
