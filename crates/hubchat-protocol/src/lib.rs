//! Wire protocol for hubchat.
//!
//! This crate defines the "language" that chat clients and the server
//! speak:
//!
//! - **Types** ([`Handle`], [`ChannelName`], [`Recipient`], [`Request`],
//!   [`ServerMessage`]) — the values parsed from and written to a
//!   connection.
//! - **Codec** ([`LineCodec`], [`FrameLimits`]) — how lines and
//!   length-prefixed `MSG` bodies are framed, parsed, and rendered.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while reading a
//!   command.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the hub
//! (chat state). It doesn't know about users or channels as live objects —
//! it only knows how to turn bytes into requests and replies into bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Request) → Hub (users, channels)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{FrameLimits, LineCodec};
pub use error::ProtocolError;
pub use types::{
    CHANNEL_PREFIX, ChannelName, CommandKind, HANDLE_PREFIX, Handle,
    Recipient, Request, ServerMessage,
};
