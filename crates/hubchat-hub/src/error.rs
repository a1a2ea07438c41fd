//! Error types for the hub layer.

use hubchat_session::SessionError;

/// Errors returned by [`HubHandle`](crate::HubHandle) calls.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The hub's inbox is closed: the hub has shut down.
    #[error("hub is unavailable")]
    Unavailable,

    /// The hub refused a registration. The client has already been told
    /// why; this carries the same reason back to the caller.
    #[error(transparent)]
    Rejected(#[from] SessionError),
}
