//! Server-side WebSocket upgrade over a hijacked connection.
//!
//! Handlers under test call [`Upgrader::upgrade`] with the writer and
//! request they were given, and get back a server-role WebSocket session
//! riding the same pipe as the harness's client session.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::{SinkExt, StreamExt};
//! use wstest::{Handler, Request, ResponseWriter, Upgrader};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
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
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use tokio::io::AsyncWriteExt;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::http::header::{
    CONNECTION, HeaderName, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE,
};
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use tokio_tungstenite::tungstenite::protocol::{Role, WebSocketConfig};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::Hijacked;

use super::ResponseWriter;

// ============================================================================
// Constants
// ============================================================================

/// The only protocol version RFC 6455 defines.
const WEBSOCKET_VERSION: &str = "13";

/// Rejection reason that also advertises the supported version.
const UNSUPPORTED_VERSION: &str = "unsupported 'Sec-WebSocket-Version'";

// ============================================================================
// Upgrader
// ============================================================================

/// Upgrades a handler's HTTP request to a WebSocket session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Upgrader {
    /// Session limits for the server side.
    config: Option<WebSocketConfig>,
}

impl Upgrader {
    /// Creates an upgrader with the library's default session limits.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server-side session configuration.
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: WebSocketConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validates the request, hijacks the connection and answers with
    /// `101 Switching Protocols`.
    ///
    /// Headers already recorded on `writer` are sent with the 101 response.
    ///
    /// # Errors
    ///
    /// - [`Error::Upgrade`] if the request is not a valid upgrade request;
    ///   the rejection is also recorded on `writer`
    /// - [`Error::AlreadyHijacked`] if the connection was already taken
    /// - [`Error::Io`] if writing the response fails
    pub async fn upgrade(
        &self,
        writer: &mut ResponseWriter,
        request: &Request<()>,
    ) -> Result<WebSocketStream<Hijacked>> {
        let key = match validate(request) {
            Ok(key) => key,
            Err((status, message)) => {
                warn!(%status, reason = message, "Rejecting upgrade request");
                writer.set_status(status);
                if message == UNSUPPORTED_VERSION {
                    writer.headers_mut().insert(
                        SEC_WEBSOCKET_VERSION,
                        HeaderValue::from_static(WEBSOCKET_VERSION),
                    );
                }
                writer.write(message.as_bytes());
                return Err(Error::upgrade(status, message));
            }
        };

        let response = switching_protocols(writer.headers(), &derive_accept_key(key.as_bytes()));

        let mut conn = writer.hijack()?;
        conn.write_all(&response).await?;
        conn.flush().await?;

        debug!(uri = %request.uri(), "Connection upgraded to WebSocket");

        Ok(WebSocketStream::from_raw_socket(conn, Role::Server, self.config).await)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks the upgrade headers and returns the client key.
fn validate(request: &Request<()>) -> StdResult<&str, (StatusCode, &'static str)> {
    if request.method() != Method::GET {
        return Err((StatusCode::METHOD_NOT_ALLOWED, "request method is not GET"));
    }

    let headers = request.headers();

    if !has_token(headers, &CONNECTION, "upgrade") {
        return Err((
            StatusCode::BAD_REQUEST,
            "'upgrade' token not found in 'Connection' header",
        ));
    }

    if !has_token(headers, &UPGRADE, "websocket") {
        return Err((
            StatusCode::BAD_REQUEST,
            "'websocket' token not found in 'Upgrade' header",
        ));
    }

    if !has_token(headers, &SEC_WEBSOCKET_VERSION, WEBSOCKET_VERSION) {
        return Err((StatusCode::BAD_REQUEST, UNSUPPORTED_VERSION));
    }

    headers
        .get(SEC_WEBSOCKET_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "'Sec-WebSocket-Key' header is missing or blank",
        ))
}

/// Returns `true` if any comma-separated value of `name` equals `token`,
/// ignoring ASCII case.
fn has_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

/// Encodes the 101 response head.
fn switching_protocols(extra: &HeaderMap, accept: &str) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n"
    )
    .into_bytes();

    for (name, value) in extra {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }

    head.extend_from_slice(b"\r\n");
    head
}

// ============================================================================
// Tests
// ============================================================================
