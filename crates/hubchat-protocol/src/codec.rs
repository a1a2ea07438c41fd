//! Framing, parsing, and rendering for the hubchat line protocol.
//!
//! The wire format is newline-terminated ASCII lines, with one exception:
//! `MSG` carries a length-prefixed body so that a message may contain
//! spaces, newlines, or any other byte.
//!
//! ```text
//! MSG #general 11\r\n        ← header line
//! hello\nworld               ← exactly 11 bytes, read with read_exact
//! ```
//!
//! A bare `\n` also ends the header, so `nc` users can type the header,
//! press enter, and type the body. Whatever line terminator follows the
//! body is left in the stream and skipped as a blank line on the next read.
//!
//! The codec never allocates more than the configured [`FrameLimits`]: an
//! overlong line is drained up to its newline, and an oversized body is
//! streamed into a sink, so the connection stays in sync after both. A
//! `MSG` header with a bad recipient but a valid length also has its body
//! skipped before the error is reported.

use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::{ChannelName, CommandKind, Handle, ProtocolError, Recipient, Request, ServerMessage};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

// ---------------------------------------------------------------------------
// FrameLimits
// ---------------------------------------------------------------------------

/// Upper bounds on what a single client can make the server buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLimits {
    /// Longest accepted command line, terminator included.
    pub max_line_len: usize,

    /// Largest accepted `MSG` body.
    pub max_body_len: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_line_len: 4096,
            max_body_len: 64 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// Reads [`Request`]s from a buffered byte stream and renders
/// [`ServerMessage`]s to bytes.
///
/// The codec is `Copy`: every connection handler gets its own copy of the
/// limits, and there is no per-connection state besides the reader itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec {
    limits: FrameLimits,
}

impl LineCodec {
    /// Creates a codec enforcing the given limits.
    pub fn new(limits: FrameLimits) -> Self {
        Self { limits }
    }

    /// Reads the next request from `reader`.
    ///
    /// Blank lines are skipped. Returns `Ok(None)` on a clean end of
    /// stream.
    ///
    /// # Errors
    /// A recoverable [`ProtocolError`] (see
    /// [`is_recoverable`](ProtocolError::is_recoverable)) means one line
    /// was rejected and the reader is positioned at the next command.
    /// [`ProtocolError::Io`] means the stream is unusable.
    pub async fn read_request<R>(&self, reader: &mut R) -> Result<Option<Request>, ProtocolError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match read_line(reader, &mut buf, self.limits.max_line_len).await? {
                LineRead::Line => {}
                LineRead::Eof => return Ok(None),
                LineRead::TooLong => {
                    return Err(ProtocolError::LineTooLong(self.limits.max_line_len));
                }
            }

            let line = std::str::from_utf8(&buf)
                .map_err(|_| ProtocolError::InvalidEncoding)?
                .trim_end_matches(LINE_ENDINGS);
            if line.trim().is_empty() {
                continue;
            }

            return match parse_line(line)? {
                ParsedLine::Request(request) => Ok(Some(request)),
                ParsedLine::MessageHeader { recipient, length } => {
                    let body = self.read_body(reader, length).await?;
                    Ok(Some(Request::SendMessage { recipient, body }))
                }
                ParsedLine::RejectedMessage { length, error } => {
                    skip_body(reader, length).await?;
                    Err(error)
                }
            };
        }
    }

    /// Reads exactly `length` body bytes following a `MSG` header.
    async fn read_body<R>(&self, reader: &mut R, length: usize) -> Result<Vec<u8>, ProtocolError>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = self.limits.max_body_len;
        if length > limit {
            skip_body(reader, length).await?;
            return Err(ProtocolError::BodyTooLarge { length, limit });
        }

        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;
        Ok(body)
    }

    /// Renders a server message as the bytes written to the client.
    pub fn encode(&self, message: &ServerMessage) -> Vec<u8> {
        let text = match message {
            ServerMessage::Registered => "Registered successfully".to_string(),
            ServerMessage::Deregistered { at } => format!("{at}: Deregistered successfully"),
            ServerMessage::Joined { at, channel } => format!("{at}: Joined channel {channel}"),
            ServerMessage::Left { at, channel } => format!("{at}: Left channel {channel}"),
            ServerMessage::ChannelList(names) => render_channel_list(names),
            ServerMessage::UserList(handles) => render_user_list(handles),
            ServerMessage::Chat { at, sender, body } => {
                let mut out = format!("{at} {sender}: ").into_bytes();
                out.extend_from_slice(body);
                out.push(b'\n');
                return out;
            }
            ServerMessage::RegisterFirst => "Please register first".to_string(),
            ServerMessage::HandleTakenHint => {
                "Handle already exists. Please choose another handle".to_string()
            }
            ServerMessage::NotRegisteredHint => {
                "User not registered. Please register first".to_string()
            }
            ServerMessage::Error(reason) => format!("ERR {reason}"),
        };

        let mut out = text.into_bytes();
        out.push(b'\n');
        out
    }
}

/// Streams `length` body bytes into a sink.
async fn skip_body<R>(reader: &mut R, length: usize) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut payload = AsyncReadExt::take(&mut *reader, length as u64);
    let skipped = tokio::io::copy(&mut payload, &mut tokio::io::sink()).await?;
    if skipped < length as u64 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

fn render_channel_list(names: &[ChannelName]) -> String {
    if names.is_empty() {
        return "No channels available".to_string();
    }
    // Each name keeps a trailing space before the separator: "#a , #b ".
    names
        .iter()
        .map(|name| format!("{name} "))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_user_list(handles: &[Handle]) -> String {
    if handles.is_empty() {
        return "No users available".to_string();
    }
    handles.iter().map(Handle::as_str).collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// The result of parsing one command line.
#[derive(Debug)]
pub(crate) enum ParsedLine {
    /// The line is a complete request.
    Request(Request),
    /// A `MSG` header; `length` body bytes follow the line.
    MessageHeader { recipient: Recipient, length: usize },
    /// A `MSG` header whose recipient was refused. The `length` body bytes
    /// still follow the line and must be skipped.
    RejectedMessage { length: usize, error: ProtocolError },
}

/// Parses one command line (terminator already stripped).
pub(crate) fn parse_line(line: &str) -> Result<ParsedLine, ProtocolError> {
    let line = line.trim();
    let (keyword, args) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    let kind = CommandKind::from_keyword(keyword)
        .ok_or_else(|| ProtocolError::UnknownCommand(keyword.to_ascii_uppercase()))?;

    let request = match kind {
        CommandKind::Register => Request::Register {
            handle: Handle::parse(args)?,
        },
        CommandKind::Join => Request::Join {
            channel: ChannelName::parse(args)?,
        },
        CommandKind::Leave => Request::Leave {
            channel: ChannelName::parse(args)?,
        },
        CommandKind::SendMessage => return parse_message_header(args),
        CommandKind::ListChannels => Request::ListChannels,
        CommandKind::ListUsers => Request::ListUsers,
    };
    Ok(ParsedLine::Request(request))
}

/// Parses `<recipient> <length>` after the `MSG` keyword.
fn parse_message_header(args: &str) -> Result<ParsedLine, ProtocolError> {
    let (recipient, length) = match args.split_once(char::is_whitespace) {
        Some((recipient, length)) => (recipient, length.trim()),
        None => (args, ""),
    };

    match (Recipient::parse(recipient), parse_length(length)) {
        (Ok(recipient), Ok(length)) => Ok(ParsedLine::MessageHeader { recipient, length }),
        (Err(error), Ok(length)) => Ok(ParsedLine::RejectedMessage { length, error }),
        (Err(error), Err(_)) | (Ok(_), Err(error)) => Err(error),
    }
}

fn parse_length(raw: &str) -> Result<usize, ProtocolError> {
    let length: usize = raw
        .parse()
        .map_err(|_| ProtocolError::InvalidLength(raw.to_string()))?;
    if length == 0 {
        return Err(ProtocolError::ZeroLength);
    }
    Ok(length)
}

// ---------------------------------------------------------------------------
// Bounded line reading
// ---------------------------------------------------------------------------

enum LineRead {
    Line,
    TooLong,
    Eof,
}

/// Reads up to and including the next `\n`, but never more than `limit`
/// bytes. A final line without a terminator still counts as a line.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let read = AsyncReadExt::take(&mut *reader, limit as u64)
        .read_until(b'\n', buf)
        .await?;

    if read == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') || read < limit {
        return Ok(LineRead::Line);
    }

    discard_through_newline(reader).await?;
    Ok(LineRead::TooLong)
}

/// Consumes bytes up to and including the next `\n` without buffering them.
async fn discard_through_newline<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, found) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if found {
            return Ok(());
        }
    }
}
