//! Raw access to the server-facing endpoint after a hijack.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader, ReadBuf};

use super::Endpoint;

// ============================================================================
// Hijacked
// ============================================================================

/// The server-facing stream handed to a handler by
/// [`ResponseWriter::hijack`](crate::http::ResponseWriter::hijack).
///
/// Reads first replay any bytes that were already pulled off the pipe while
/// the request head was parsed, then continue with the live stream. Writes
/// go straight to the endpoint.
#[derive(Debug)]
pub struct Hijacked {
    inner: BufReader<Endpoint>,
}

impl Hijacked {
    pub(crate) fn new(inner: BufReader<Endpoint>) -> Self {
        Self { inner }
    }

    /// Bytes received but not yet read.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        self.inner.buffer()
    }

    /// Returns the underlying endpoint.
    #[inline]
    #[must_use]
    pub fn get_ref(&self) -> &Endpoint {
        self.inner.get_ref()
    }

    /// Splits into the raw endpoint and the bytes it had buffered.
    ///
    /// The caller must consume the returned bytes before reading from the
    /// endpoint again.
    #[must_use]
    pub fn into_parts(self) -> (Endpoint, Vec<u8>) {
        let buffered = self.inner.buffer().to_vec();
        (self.inner.into_inner(), buffered)
    }
}

impl AsyncRead for Hijacked {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncBufRead for Hijacked {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        Pin::new(&mut self.get_mut().inner).poll_fill_buf(cx)
    }

    fn consume(mut self: Pin<&mut Self>, amt: usize) {
        Pin::new(&mut self.inner).consume(amt);
    }
}

impl AsyncWrite for Hijacked {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(self.inner.get_mut()).poll_write(cx, data)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self.inner.get_mut()).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(self.inner.get_mut()).poll_shutdown(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================
