//! Messages exchanged through the harness.
//!
//! A [`Message`] pairs a [`MessageKind`] with a byte payload. It is the
//! harness's own value type, decoupled from the WebSocket library's message
//! enum.
//!
//! Close payloads use the wire layout: a 2-byte big-endian status code
//! followed by a UTF-8 reason. An empty close payload carries no code.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::error::{Error, Result};

// ============================================================================
// MessageKind
// ============================================================================

/// Frame kind of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// UTF-8 text data.
    Text,
    /// Binary data.
    Binary,
    /// Close control frame.
    Close,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
}

impl MessageKind {
    /// Returns `true` for close, ping and pong.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Message
// ============================================================================

/// An immutable WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    data: Vec<u8>,
}

impl Message {
    /// Creates a message of any kind.
    ///
    /// Text payloads are checked for UTF-8 only when the message is sent.
    #[inline]
    #[must_use]
    pub fn new(kind: MessageKind, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Text, text.into())
    }

    /// Creates a binary message.
    #[inline]
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageKind::Binary, data)
    }

    /// Creates a ping message.
    #[inline]
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageKind::Ping, data)
    }

    /// Creates a pong message.
    #[inline]
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageKind::Pong, data)
    }

    /// Creates a close message with a status code and reason.
    #[must_use]
    pub fn close(code: u16, reason: &str) -> Self {
        let mut data = Vec::with_capacity(2 + reason.len());
        data.extend_from_slice(&code.to_be_bytes());
        data.extend_from_slice(reason.as_bytes());
        Self::new(MessageKind::Close, data)
    }

    /// Returns the frame kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the payload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the message and returns the payload.
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the payload as text for text messages with valid UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            MessageKind::Text => std::str::from_utf8(&self.data).ok(),
            _ => None,
        }
    }

    /// Returns the status code of a close message, if it carries one.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match (self.kind, self.data.as_slice()) {
            (MessageKind::Close, [hi, lo, ..]) => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl TryFrom<Message> for WsMessage {
    type Error = Error;

    fn try_from(message: Message) -> Result<Self> {
        let Message { kind, data } = message;

        let converted = match kind {
            MessageKind::Text => {
                let text = String::from_utf8(data)
                    .map_err(|_| Error::protocol("text message payload is not valid UTF-8"))?;
                Self::text(text)
            }
            MessageKind::Binary => Self::binary(data),
            MessageKind::Ping => Self::Ping(data.into()),
            MessageKind::Pong => Self::Pong(data.into()),
            MessageKind::Close => Self::Close(close_frame(data)?),
        };

        Ok(converted)
    }
}

impl TryFrom<WsMessage> for Message {
    type Error = Error;

    fn try_from(message: WsMessage) -> Result<Self> {
        let converted = match message {
            WsMessage::Text(text) => Self::text(text.as_str()),
            WsMessage::Binary(data) => Self::binary(data.to_vec()),
            WsMessage::Ping(data) => Self::ping(data.to_vec()),
            WsMessage::Pong(data) => Self::pong(data.to_vec()),
            WsMessage::Close(None) => Self::new(MessageKind::Close, Vec::new()),
            WsMessage::Close(Some(frame)) => Self::close(u16::from(frame.code), frame.reason.as_str()),
            WsMessage::Frame(_) => return Err(Error::protocol("unexpected raw frame")),
        };

        Ok(converted)
    }
}

/// Decodes a close payload into a close frame.
fn close_frame(data: Vec<u8>) -> Result<Option<CloseFrame>> {
    match data.as_slice() {
        [] => Ok(None),
        [_] => Err(Error::protocol("close payload must be empty or at least 2 bytes")),
        [hi, lo, reason @ ..] => {
            let code = CloseCode::from(u16::from_be_bytes([*hi, *lo]));
            let reason = String::from_utf8(reason.to_vec())
                .map_err(|_| Error::protocol("close reason is not valid UTF-8"))?;
            Ok(Some(CloseFrame {
                code,
                reason: reason.into(),
            }))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
