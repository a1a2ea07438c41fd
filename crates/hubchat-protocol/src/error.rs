//! Error types for the protocol layer.
//!
//! Each crate in hubchat defines its own error enum. This keeps errors
//! specific and meaningful: a `ProtocolError` means a client sent a line
//! the server could not turn into a request, or the byte stream itself
//! failed underneath the parser.
//!
//! The `Display` text of every recoverable variant is exactly what the
//! client sees after `ERR `, so the messages are written for users, not
//! for logs.

/// Errors that can occur while reading or parsing client input.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The first word of the line is not a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// `REG` was sent without a handle.
    #[error("handle cannot be empty")]
    EmptyHandle,

    /// The handle does not start with `@`.
    #[error("invalid handle: {0}. Must start with @")]
    InvalidHandle(String),

    /// `JOIN`/`LEAVE` was sent without a channel name.
    #[error("channel name cannot be empty")]
    EmptyChannel,

    /// The channel name does not start with `#`.
    #[error("invalid channel name: {0}. Must start with #")]
    InvalidChannel(String),

    /// The `MSG` recipient is neither a channel nor a user.
    #[error("invalid recipient: {0}. Must be a channel ('#name') or user ('@user')")]
    InvalidRecipient(String),

    /// A bare `#` or `@` where a name is required.
    #[error("{0} must have a name")]
    MissingName(String),

    /// Handles and channel names are single words.
    #[error("{0} must not contain whitespace")]
    ContainsWhitespace(String),

    /// The `MSG` length field is missing or not a decimal number.
    #[error("body length must be present | invalid message length: {0}")]
    InvalidLength(String),

    /// The `MSG` length field is zero.
    #[error("body length must be at least 1")]
    ZeroLength,

    /// The declared body is larger than the configured limit. The body
    /// bytes have already been skipped when this is returned.
    #[error("body length {length} exceeds limit of {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },

    /// A command line ran past the configured limit without a newline.
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Command lines are text; only `MSG` bodies may carry raw bytes.
    #[error("command line is not valid UTF-8")]
    InvalidEncoding,

    /// The underlying stream failed or ended in the middle of a frame.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns `true` if the session can keep going after reporting this
    /// error to the client.
    ///
    /// Everything except an I/O failure is a problem with one line; the
    /// reader is still positioned at the start of the next command.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
