//! In-process WebSocket test harness.
//!
//! Exercises a server-side handler that performs a WebSocket upgrade
//! without binding a socket. The handler and the test talk over an
//! in-memory duplex pipe that behaves like a TCP connection.
//!
//! # Architecture
//!
//! - **Pipe pair**: two [`Endpoint`]s over bounded in-memory buffers
//! - **Harness**: runs the handler in a spawned task on the server endpoint,
//!   handshakes as a client on the other, then sends and receives messages
//!
//! The handler sees a parsed request and a [`ResponseWriter`]. It upgrades
//! with [`Upgrader`], takes the raw stream with [`ResponseWriter::hijack`],
//! or answers with a plain HTTP response, which makes the client handshake
//! fail.
//!
//! # Quick Start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use futures_util::{SinkExt, StreamExt};
//! use wstest::{Handler, Harness, Message, Request, ResponseWriter, Result, Upgrader};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Handler for Echo {
//!     async fn serve(&self, writer: &mut ResponseWriter, request: Request<()>) {
//!         let Ok(mut ws) = Upgrader::new().upgrade(writer, &request).await else {
//!             return;
//!         };
//!         while let Some(Ok(message)) = ws.next().await {
//!             if message.is_close() || ws.send(message).await.is_err() {
//!                 break;
//!             }
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut harness = Harness::new();
//!     harness.connect(Echo).await?;
//!
//!     harness.send(Message::text("hello")).await?;
//!     let reply = harness.receive().await?;
//!     assert_eq!(reply.as_text(), Some("hello"));
//!
//!     harness.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`harness`] | [`Harness`], [`Handler`] and configuration |
//! | [`http`] | Request parsing, [`ResponseWriter`], [`Upgrader`] |
//! | [`message`] | [`Message`] and [`MessageKind`] |
//! | [`transport`] | Pipe pair and hijacked stream |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Harness orchestrator.
///
/// Use [`Harness::new()`] or [`Harness::builder()`] to create one.
pub mod harness;

/// HTTP side of the handshake.
pub mod http;

/// Message value type.
pub mod message;

/// In-memory transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Harness types
pub use harness::{Handler, Harness, HarnessBuilder, HarnessOptions, HarnessState};

// HTTP types
pub use http::{ResponseWriter, Upgrader};
pub use tokio_tungstenite::tungstenite::http::{Request, StatusCode};

// Message types
pub use message::{Message, MessageKind};

// Transport types
pub use transport::{Endpoint, Hijacked, Side, pipe_pair};
