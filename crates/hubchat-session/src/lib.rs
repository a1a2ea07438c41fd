//! Client sessions and handle registration for hubchat.
//!
//! This crate holds the two pieces of per-user state the hub works with:
//!
//! 1. **Client references** ([`ClientRef`]) — the hub's view of one
//!    connection: its id, its handle, and the queue its writer task drains.
//! 2. **The registry** ([`Registry`]) — the map from handle to client that
//!    makes handles unique.
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub Layer (above)  ← owns the registry, writes client handles
//!     ↕
//! Session Layer (this crate)  ← identity and outbound delivery
//!     ↕
//! Protocol Layer (below)  ← provides Handle, ServerMessage
//! ```

mod client;
mod error;
mod registry;

pub use client::{ClientRef, OutboundReceiver, OutboundSender};
pub use error::SessionError;
pub use registry::Registry;
