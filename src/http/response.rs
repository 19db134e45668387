//! Response writer handed to handlers.
//!
//! Records the status, headers and body a handler produces. When the
//! handler returns without hijacking, the recorded response is sent to the
//! client as a plain HTTP/1.1 response and the server endpoint is closed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio_tungstenite::tungstenite::http::header::CONTENT_LENGTH;
use tokio_tungstenite::tungstenite::http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{Endpoint, Hijacked};

// ============================================================================
// ResponseWriter
// ============================================================================

/// Response-writing capability passed to a [`Handler`](crate::Handler).
///
/// Also the only way to reach the raw server-facing stream, via
/// [`hijack`](Self::hijack).
#[derive(Debug)]
pub struct ResponseWriter {
    /// Server-facing stream; `None` once hijacked.
    conn: Option<BufReader<Endpoint>>,
    /// Shared with the owning harness.
    hijacked: Arc<AtomicBool>,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub(crate) fn new(conn: BufReader<Endpoint>, hijacked: Arc<AtomicBool>) -> Self {
        Self {
            conn: Some(conn),
            hijacked,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Returns the recorded status (200 unless changed).
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the response status.
    #[inline]
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the recorded headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the recorded headers for modification.
    ///
    /// Headers set before an upgrade are included in the
    /// `101 Switching Protocols` response.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Appends `data` to the response body.
    #[inline]
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    /// Returns the recorded body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns `true` once the connection has been hijacked.
    #[inline]
    #[must_use]
    pub fn is_hijacked(&self) -> bool {
        self.hijacked.load(Ordering::Acquire)
    }

    /// Takes over the raw server-facing stream.
    ///
    /// The returned stream replays any bytes read past the request head.
    /// After a hijack nothing is written on the handler's behalf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyHijacked`] on every call after the first.
    pub fn hijack(&mut self) -> Result<Hijacked> {
        if self.hijacked.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyHijacked);
        }
        let conn = self.conn.take().ok_or(Error::AlreadyHijacked)?;

        debug!(buffered = conn.buffer().len(), "Connection hijacked");

        Ok(Hijacked::new(conn))
    }

    /// Sends the recorded response and closes the endpoint, unless the
    /// connection was hijacked.
    pub(crate) async fn finish(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        let head = self.encode_head();
        let stream = conn.get_mut();
        stream.write_all(&head).await?;
        stream.write_all(&self.body).await?;
        stream.flush().await?;
        stream.close();

        debug!(status = %self.status, body_len = self.body.len(), "Response sent");

        Ok(())
    }

    /// Encodes the status line and headers.
    fn encode_head(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        )
        .into_bytes();

        for (name, value) in &self.headers {
            head.extend_from_slice(name.as_str().as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }

        if !self.headers.contains_key(CONTENT_LENGTH) {
            head.extend_from_slice(format!("content-length: {}\r\n", self.body.len()).as_bytes());
        }

        head.extend_from_slice(b"\r\n");
        head
    }
}

// ============================================================================
// Tests
// ============================================================================
