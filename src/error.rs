//! Error types for the WebSocket test harness.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wstest::{Harness, Message, Result};
//!
//! async fn example(harness: &mut Harness) -> Result<()> {
//!     harness.send(Message::text("ping")).await?;
//!     let reply = harness.receive().await?;
//!     assert_eq!(reply.data(), b"ping");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Handshake | [`Error::Handshake`], [`Error::Upgrade`] |
//! | Lifecycle | [`Error::NotConnected`], [`Error::AlreadyConnected`], [`Error::AlreadyHijacked`] |
//! | Stream | [`Error::ConnectionClosed`], [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::http::StatusCode;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when harness configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// Client-side WebSocket handshake failed.
    ///
    /// Carries the WebSocket library's error verbatim, including the HTTP
    /// response when the handler answered without upgrading.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[source] WsError),

    /// Server-side upgrade rejected the request.
    ///
    /// The same status and message are recorded on the response writer.
    #[error("Upgrade rejected ({status}): {message}")]
    Upgrade {
        /// Status recorded on the response.
        status: StatusCode,
        /// Reason for the rejection.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// No protocol session is open.
    ///
    /// Returned by send/receive/close before connect succeeded or after close.
    #[error("Not connected")]
    NotConnected,

    /// Connect was already attempted on this harness, whether or not the
    /// handshake succeeded.
    #[error("Harness connect already attempted")]
    AlreadyConnected,

    /// The server-facing stream was already hijacked.
    #[error("already hijacked")]
    AlreadyHijacked,

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// The peer closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed request, frame or message payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an upgrade rejection error.
    #[inline]
    pub fn upgrade(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Upgrade {
            status,
            message: message.into(),
        }
    }

    /// Maps a session-level WebSocket error, folding every way the peer
    /// can go away into [`Error::ConnectionClosed`].
    ///
    /// That covers a finished close handshake, end of stream without a
    /// close frame, and writes into an endpoint the peer already dropped.
    pub(crate) fn from_session(err: WsError) -> Self {
        match err {
            WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                Self::ConnectionClosed
            }
            WsError::Io(e) if is_peer_gone(e.kind()) => Self::ConnectionClosed,
            other => Self::WebSocket(other),
        }
    }
}

fn is_peer_gone(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof
    )
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::NotConnected | Self::Io(_) | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the handler answered the upgrade request with a
    /// plain HTTP response.
    #[inline]
    #[must_use]
    pub fn is_handshake_rejection(&self) -> bool {
        matches!(self, Self::Handshake(WsError::Http(_)))
    }

    /// Returns the HTTP status of a rejected handshake, if any.
    #[must_use]
    pub fn handshake_status(&self) -> Option<StatusCode> {
        match self {
            Self::Handshake(WsError::Http(response)) => Some(response.status()),
            Self::Upgrade { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
