//! Unified error type for hubchat.

use hubchat_hub::HubError;
use hubchat_protocol::ProtocolError;
use hubchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HubchatError {
    /// Binding or accepting failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A client sent something unreadable, or its stream failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The hub has stopped.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The configuration file could not be read or parsed.
    #[error("failed to load config {path}: {reason}")]
    Config { path: String, reason: String },
}
