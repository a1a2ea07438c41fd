//! Core protocol types for hubchat's wire format.
//!
//! This module defines every value that is parsed from, or rendered onto,
//! a client connection. Requests flow client → server; [`ServerMessage`]s
//! flow server → client.

use std::fmt;

use crate::ProtocolError;

/// Prefix that marks a user handle (`@alice`).
pub const HANDLE_PREFIX: char = '@';

/// Prefix that marks a channel name (`#general`).
pub const CHANNEL_PREFIX: char = '#';

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A user's chosen identifier, e.g. `@alice`.
///
/// Built only through [`Handle::parse`]: always starts with `@` and has no
/// whitespace. A bare `@` parses; the registry refuses it when claimed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Parses and validates a handle. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// - [`ProtocolError::EmptyHandle`] — nothing left after trimming
    /// - [`ProtocolError::InvalidHandle`] — does not start with `@`
    /// - [`ProtocolError::ContainsWhitespace`] — more than one word
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProtocolError::EmptyHandle);
        }
        if !raw.starts_with(HANDLE_PREFIX) {
            return Err(ProtocolError::InvalidHandle(raw.to_string()));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(ProtocolError::ContainsWhitespace(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the handle including its `@` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the handle `@` with no name after it.
    pub fn is_bare(&self) -> bool {
        self.0.len() == HANDLE_PREFIX.len_utf8()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The name of a chat room, e.g. `#general`. A bare `#` does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    /// Parses and validates a channel name. Surrounding whitespace is
    /// trimmed.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProtocolError::EmptyChannel);
        }
        if !raw.starts_with(CHANNEL_PREFIX) {
            return Err(ProtocolError::InvalidChannel(raw.to_string()));
        }
        if raw.len() == CHANNEL_PREFIX.len_utf8() {
            return Err(ProtocolError::MissingName(raw.to_string()));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(ProtocolError::ContainsWhitespace(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the name including its `#` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// The target of a `MSG` command, chosen by its prefix character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// Broadcast to every member of a channel.
    Channel(ChannelName),
    /// Deliver directly to one registered user.
    User(Handle),
}

impl Recipient {
    /// Parses a recipient token: `#name` or `@user`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        match raw.chars().next() {
            Some(CHANNEL_PREFIX) => ChannelName::parse(raw).map(Self::Channel),
            Some(HANDLE_PREFIX) => {
                let handle = Handle::parse(raw)?;
                if handle.is_bare() {
                    return Err(ProtocolError::MissingName(raw.to_string()));
                }
                Ok(Self::User(handle))
            }
            _ => Err(ProtocolError::InvalidRecipient(raw.to_string())),
        }
    }

    /// Returns the recipient as it appeared on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Channel(name) => name.as_str(),
            Self::User(handle) => handle.as_str(),
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests (client → server)
// ---------------------------------------------------------------------------

/// The tag of a client command, independent of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Register,
    Join,
    Leave,
    SendMessage,
    ListChannels,
    ListUsers,
}

impl CommandKind {
    /// Every command, in wire-documentation order.
    pub const ALL: [Self; 6] = [
        Self::Register,
        Self::Join,
        Self::Leave,
        Self::SendMessage,
        Self::ListChannels,
        Self::ListUsers,
    ];

    /// The keyword that starts a command line.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Register => "REG",
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
            Self::SendMessage => "MSG",
            Self::ListChannels => "CHNS",
            Self::ListUsers => "USRS",
        }
    }

    /// Looks up a command by keyword, ignoring ASCII case.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A fully parsed client command, including the `MSG` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `REG @handle`
    Register { handle: Handle },
    /// `JOIN #channel`
    Join { channel: ChannelName },
    /// `LEAVE #channel`
    Leave { channel: ChannelName },
    /// `MSG <recipient> <len>\r\n<body>`
    SendMessage { recipient: Recipient, body: Vec<u8> },
    /// `CHNS`
    ListChannels,
    /// `USRS`
    ListUsers,
}

impl Request {
    /// Returns the command tag of this request.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Register { .. } => CommandKind::Register,
            Self::Join { .. } => CommandKind::Join,
            Self::Leave { .. } => CommandKind::Leave,
            Self::SendMessage { .. } => CommandKind::SendMessage,
            Self::ListChannels => CommandKind::ListChannels,
            Self::ListUsers => CommandKind::ListUsers,
        }
    }
}

// ---------------------------------------------------------------------------
// Server messages (server → client)
// ---------------------------------------------------------------------------

/// Everything the server can write to a client connection.
///
/// The hub produces these; the client's writer task renders them with
/// [`LineCodec::encode`](crate::LineCodec::encode). Timestamps (`at`) are
/// already formatted by the hub's clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Registration succeeded.
    Registered,
    /// The client was removed from the hub.
    Deregistered { at: String },
    /// The client is now a member of `channel`.
    Joined { at: String, channel: ChannelName },
    /// The client is no longer a member of `channel`.
    Left { at: String, channel: ChannelName },
    /// Reply to `CHNS`. Empty means "no channels".
    ChannelList(Vec<ChannelName>),
    /// Reply to `USRS`. Empty means "no users".
    UserList(Vec<Handle>),
    /// A channel broadcast or a direct message.
    Chat {
        at: String,
        sender: Handle,
        body: Vec<u8>,
    },
    /// The operation needs a registered handle.
    RegisterFirst,
    /// Follow-up line after a duplicate-handle error.
    HandleTakenHint,
    /// Follow-up line after `MSG` from an unregistered client.
    NotRegisteredHint,
    /// A rejected command; rendered as `ERR <reason>`.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_parse_valid_trims_whitespace() {
        let handle = Handle::parse("  @alice \t").expect("valid handle");
        assert_eq!(handle.as_str(), "@alice");
        assert_eq!(handle.to_string(), "@alice");
    }

    #[test]
    fn test_handle_parse_empty_and_blank_rejected() {
        assert!(matches!(Handle::parse(""), Err(ProtocolError::EmptyHandle)));
        assert!(matches!(
            Handle::parse("   "),
            Err(ProtocolError::EmptyHandle)
        ));
    }

    #[test]
    fn test_handle_parse_missing_prefix_rejected() {
        assert!(matches!(
            Handle::parse("alice"),
            Err(ProtocolError::InvalidHandle(h)) if h == "alice"
        ));
    }

    #[test]
    fn test_handle_parse_inner_whitespace_rejected() {
        assert!(matches!(
            Handle::parse("@al ice"),
            Err(ProtocolError::ContainsWhitespace(_))
        ));
    }

    #[test]
    fn test_handle_parse_bare_prefix_is_syntactically_valid() {
        let handle = Handle::parse("@").expect("bare @ parses");
        assert!(handle.is_bare());
        assert!(!Handle::parse("@a").expect("valid").is_bare());
    }

    #[test]
    fn test_channel_name_parse_rules() {
        assert_eq!(
            ChannelName::parse(" #general ").expect("valid").as_str(),
            "#general"
        );
        assert!(matches!(
            ChannelName::parse(""),
            Err(ProtocolError::EmptyChannel)
        ));
        assert!(matches!(
            ChannelName::parse("general"),
            Err(ProtocolError::InvalidChannel(_))
        ));
        assert!(matches!(
            ChannelName::parse("#"),
            Err(ProtocolError::MissingName(_))
        ));
        assert!(matches!(
            ChannelName::parse("#a b"),
            Err(ProtocolError::ContainsWhitespace(_))
        ));
    }

    #[test]
    fn test_recipient_parse_dispatches_on_prefix() {
        assert!(matches!(
            Recipient::parse("#general"),
            Ok(Recipient::Channel(c)) if c.as_str() == "#general"
        ));
        assert!(matches!(
            Recipient::parse("@bob"),
            Ok(Recipient::User(h)) if h.as_str() == "@bob"
        ));
        assert!(matches!(
            Recipient::parse("bob"),
            Err(ProtocolError::InvalidRecipient(_))
        ));
        assert!(matches!(
            Recipient::parse(""),
            Err(ProtocolError::InvalidRecipient(_))
        ));
        assert!(matches!(
            Recipient::parse("@"),
            Err(ProtocolError::MissingName(_))
        ));
    }

    #[test]
    fn test_command_kind_from_keyword_ignores_case() {
        assert_eq!(CommandKind::from_keyword("reg"), Some(CommandKind::Register));
        assert_eq!(CommandKind::from_keyword("Msg"), Some(CommandKind::SendMessage));
        assert_eq!(CommandKind::from_keyword("CHNS"), Some(CommandKind::ListChannels));
        assert_eq!(CommandKind::from_keyword("QUIT"), None);
    }

    #[test]
    fn test_command_kind_keyword_roundtrips() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_keyword(kind.keyword()), Some(kind));
        }
    }

    #[test]
    fn test_request_kind() {
        let req = Request::Join {
            channel: ChannelName::parse("#a").expect("valid"),
        };
        assert_eq!(req.kind(), CommandKind::Join);
        assert_eq!(Request::ListUsers.kind(), CommandKind::ListUsers);
    }
}
