//! Error types for the session layer.

use hubchat_protocol::Handle;

/// Reasons a registration attempt is refused.
///
/// The `Display` text is sent to the client verbatim after `ERR `.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The handle is empty, whitespace, or a bare `@`.
    #[error("handle cannot be empty")]
    InvalidHandle,

    /// Another live client already holds this handle.
    #[error("handle {0} already exists")]
    HandleTaken(Handle),

    /// This client already completed registration. Registration is
    /// one-way: a client cannot switch handles mid-session.
    #[error("already registered as {0}")]
    AlreadyRegistered(Handle),
}
