//! Harness orchestrator.
//!
//! Owns both ends of a pipe pair. [`Harness::connect`] runs the handler
//! against the server end in a spawned task while the calling task performs
//! the client handshake over the client end. Afterwards the test drives the
//! client session with [`send`](Harness::send), [`receive`](Harness::receive)
//! and [`close`](Harness::close).
//!
//! # State Machine
//!
//! ```text
//! Created ──connect──► Handshaking ──┬──► Connected ──close──► Closed
//!                                    └──► Failed
//! ```
//!
//! Hijacking is tracked separately; it happens inside the handler.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Response;
use tracing::{Instrument, debug, info, info_span, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::transport::{Endpoint, pipe_pair};

use super::builder::HarnessBuilder;
use super::handler::{self, Handler};
use super::options::HarnessOptions;

// ============================================================================
// HarnessState
// ============================================================================

/// Lifecycle state of a [`Harness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    /// Pipe allocated, no handshake yet.
    Created,
    /// Handshake in progress.
    Handshaking,
    /// Session open.
    Connected,
    /// Handshake failed.
    Failed,
    /// Session closed by the test.
    Closed,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Handshaking => "handshaking",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// In-process WebSocket client for testing upgrade handlers.
///
/// One harness serves one connection.
///
/// # Example
///
/// ```ignore
/// let mut harness = Harness::new();
/// harness.connect(EchoHandler).await?;
///
/// harness.send(Message::text("hello")).await?;
/// let reply = harness.receive().await?;
/// assert_eq!(reply.as_text(), Some("hello"));
///
/// harness.close().await?;
/// ```
pub struct Harness {
    /// Identifies this harness in logs.
    id: Uuid,
    options: HarnessOptions,
    /// Server-facing endpoint until connect hands it to the handler.
    server: Option<Endpoint>,
    /// Client-facing endpoint until connect wraps it in a session.
    client: Option<Endpoint>,
    /// Set once by the handler's response writer.
    hijacked: Arc<AtomicBool>,
    session: Option<WebSocketStream<Endpoint>>,
    handshake: Option<Response>,
    state: HarnessState,
}

// ============================================================================
// Harness - Constructors
// ============================================================================

impl Harness {
    /// Creates a harness with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(HarnessOptions::default())
    }

    /// Creates a builder for a configured harness.
    #[inline]
    #[must_use]
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    /// Creates a harness from validated options.
    pub(crate) fn with_options(options: HarnessOptions) -> Self {
        let (server, client) = pipe_pair(options.pipe_capacity);
        let id = Uuid::new_v4();

        debug!(harness = %id, capacity = options.pipe_capacity, "Harness created");

        Self {
            id,
            options,
            server: Some(server),
            client: Some(client),
            hijacked: Arc::new(AtomicBool::new(false)),
            session: None,
            handshake: None,
            state: HarnessState::Created,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Harness - Accessors
// ============================================================================

impl Harness {
    /// Returns the id used in this harness's log records.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// Returns `true` while the harness holds a session.
    ///
    /// This tracks the local handle only: it turns `false` on
    /// [`close`](Self::close), not when the handler goes away. A peer close
    /// shows up as [`Error::ConnectionClosed`] on the next
    /// [`receive`](Self::receive) or [`send`](Self::send).
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Returns `true` once the handler has hijacked the connection.
    #[inline]
    #[must_use]
    pub fn is_hijacked(&self) -> bool {
        self.hijacked.load(Ordering::Acquire)
    }

    /// Returns the handler's `101` response after a successful connect.
    #[inline]
    #[must_use]
    pub fn handshake_response(&self) -> Option<&Response> {
        self.handshake.as_ref()
    }

    /// Returns the options this harness was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }
}

// ============================================================================
// Harness - Operations
// ============================================================================

impl Harness {
    /// Runs `handler` against the server endpoint and performs the client
    /// handshake.
    ///
    /// The handler starts immediately in its own task and keeps running
    /// whatever this call returns. Its completion is not reported here.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if connect was called before, even if
    ///   that handshake failed; a harness serves one connection attempt
    /// - [`Error::Handshake`] if the handler did not upgrade, or the stream
    ///   failed before the handshake completed
    pub async fn connect<H: Handler>(&mut self, handler: H) -> Result<()> {
        let (Some(server), Some(client)) = (self.server.take(), self.client.take()) else {
            return Err(Error::AlreadyConnected);
        };

        self.state = HarnessState::Handshaking;

        let span = info_span!("handler", harness = %self.id);
        tokio::spawn(handler::run(handler, server, Arc::clone(&self.hijacked)).instrument(span));

        let mut request = match self.options.url.as_str().into_client_request() {
            Ok(request) => request,
            Err(e) => {
                self.state = HarnessState::Failed;
                return Err(Error::Handshake(e));
            }
        };
        request
            .headers_mut()
            .extend(self.options.headers.clone());

        match tokio_tungstenite::client_async_with_config(request, client, self.options.websocket)
            .await
        {
            Ok((session, response)) => {
                info!(harness = %self.id, status = %response.status(), "WebSocket handshake completed");
                self.session = Some(session);
                self.handshake = Some(response);
                self.state = HarnessState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!(harness = %self.id, error = %e, "WebSocket handshake failed");
                self.state = HarnessState::Failed;
                Err(Error::Handshake(e))
            }
        }
    }

    /// Waits for the next message from the handler.
    ///
    /// Control frames are returned like data frames; pings have already
    /// been answered by the time they are seen here.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    /// - [`Error::ConnectionClosed`] if the handler closed the stream, with
    ///   or without a close frame
    /// - [`Error::WebSocket`] on protocol or transport failure
    pub async fn receive(&mut self) -> Result<Message> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;

        let message = match session.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(Error::from_session(e)),
            None => return Err(Error::ConnectionClosed),
        };

        let message = Message::try_from(message)?;
        trace!(harness = %self.id, kind = %message.kind(), len = message.data().len(), "Message received");

        Ok(message)
    }

    /// Sends `message` and waits until it is fully written to the pipe.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    /// - [`Error::Protocol`] if the payload does not fit the message kind
    /// - [`Error::ConnectionClosed`] if the session was already closed
    /// - [`Error::WebSocket`] if the write fails
    pub async fn send(&mut self, message: Message) -> Result<()> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;

        let kind = message.kind();
        let len = message.data().len();
        let message = WsMessage::try_from(message)?;

        session.send(message).await.map_err(Error::from_session)?;

        trace!(harness = %self.id, %kind, len, "Message sent");

        Ok(())
    }

    /// Sends a close frame and releases the client endpoint.
    ///
    /// The server endpoint is left to the handler, which sees the close
    /// frame followed by end of stream.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no session is open
    /// - [`Error::WebSocket`] if writing the close frame fails
    pub async fn close(&mut self) -> Result<()> {
        let mut session = self.session.take().ok_or(Error::NotConnected)?;
        self.state = HarnessState::Closed;

        let result = session.close(None).await;
        drop(session);

        debug!(harness = %self.id, "Harness closed");

        match result.map_err(Error::from_session) {
            Ok(()) | Err(Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("hijacked", &self.is_hijacked())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
