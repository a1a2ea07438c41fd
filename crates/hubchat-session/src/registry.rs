//! Handle registry: which client owns which handle.
//!
//! The registry is plain, synchronous state. It is owned by the hub actor,
//! so every call runs on one task and no locking is needed here. The only
//! shared state it touches is each client's handle cell, which it writes
//! to keep the client's view in step with the map.

use std::collections::BTreeMap;

use hubchat_protocol::Handle;

use crate::client::ClientRef;
use crate::error::SessionError;

/// Map from handle to the live client holding it.
///
/// A `BTreeMap` keeps handles sorted, so [`handles`](Registry::handles)
/// returns a stable listing.
#[derive(Debug, Default)]
pub struct Registry {
    users: BTreeMap<Handle, ClientRef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handle` to `client`.
    ///
    /// On success the client's handle cell is set. When the handle is
    /// taken the client's cell is cleared so it may retry.
    ///
    /// # Errors
    /// - [`SessionError::InvalidHandle`] — the handle is a bare `@`
    /// - [`SessionError::AlreadyRegistered`] — this client already holds
    ///   a handle
    /// - [`SessionError::HandleTaken`] — another client holds `handle`
    pub fn register(
        &mut self,
        client: &ClientRef,
        handle: Handle,
    ) -> Result<(), SessionError> {
        if handle.is_bare() {
            return Err(SessionError::InvalidHandle);
        }

        if let Some(current) = self.resolve(client) {
            return Err(SessionError::AlreadyRegistered(current.clone()));
        }

        if self.users.contains_key(&handle) {
            client.reset_handle();
            return Err(SessionError::HandleTaken(handle));
        }

        client.assign_handle(handle.clone());
        self.users.insert(handle, client.clone());
        Ok(())
    }

    /// Removes the client's entry and returns the handle it held.
    ///
    /// Only removes the entry if it still belongs to this client's
    /// connection. Returns `None` for unregistered clients, and for a
    /// client whose handle has since been claimed by another connection.
    pub fn deregister(&mut self, client: &ClientRef) -> Option<Handle> {
        let handle = self.resolve(client)?.clone();
        self.users.remove(&handle);
        Some(handle)
    }

    /// Returns the handle `client` is registered under, if the registry
    /// agrees that this connection owns it.
    pub fn resolve(&self, client: &ClientRef) -> Option<&Handle> {
        let handle = client.handle()?;
        match self.users.get_key_value(&handle) {
            Some((key, entry)) if entry.id() == client.id() => Some(key),
            _ => None,
        }
    }

    /// Looks up the client registered under `handle`.
    pub fn get(&self, handle: &Handle) -> Option<&ClientRef> {
        self.users.get(handle)
    }

    /// All registered handles, sorted.
    pub fn handles(&self) -> Vec<Handle> {
        self.users.keys().cloned().collect()
    }

    /// Iterates over every registered client.
    pub fn clients(&self) -> impl Iterator<Item = &ClientRef> {
        self.users.values()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
