//! In-memory duplex pipe pair.
//!
//! Two [`Endpoint`] handles share a pair of bounded byte buffers, one per
//! direction. Bytes written on one endpoint become readable on the other,
//! in order, as if they had crossed a socket.
//!
//! # Semantics
//!
//! | Operation | Condition | Result |
//! |-----------|-----------|--------|
//! | read | data buffered | returns data |
//! | read | empty, peer open | pending until the peer writes |
//! | read | empty, peer closed | `Ok(0)` (end of stream) |
//! | write | space available | accepts up to the free space |
//! | write | buffer full | pending until the peer reads |
//! | write | peer closed | `BrokenPipe` |
//! | read / write | local endpoint closed | `NotConnected` |

// ============================================================================
// Imports
// ============================================================================

use std::cmp;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Default per-direction buffer capacity in bytes.
pub const DEFAULT_PIPE_CAPACITY: usize = 1024;

// ============================================================================
// Side
// ============================================================================

/// Which end of the pair an [`Endpoint`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Server-facing endpoint, driven by the handler.
    Server,
    /// Client-facing endpoint, driven by the test.
    Client,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

// ============================================================================
// Pipe
// ============================================================================

/// One direction of the pair.
struct Pipe {
    buffer: VecDeque<u8>,
    capacity: usize,
    /// Task waiting for data.
    read_waker: Option<Waker>,
    /// Task waiting for free space.
    write_waker: Option<Waker>,
    /// Writing endpoint closed; reads drain then see EOF.
    writer_closed: bool,
    /// Reading endpoint closed; writes fail.
    reader_closed: bool,
}

impl Pipe {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            read_waker: None,
            write_waker: None,
            writer_closed: false,
            reader_closed: false,
        }
    }

    fn poll_read(&mut self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if self.buffer.is_empty() {
            if self.writer_closed {
                return Poll::Ready(Ok(()));
            }
            self.read_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        let n = cmp::min(self.buffer.len(), buf.remaining());
        let (front, back) = self.buffer.as_slices();
        let head = cmp::min(n, front.len());
        buf.put_slice(&front[..head]);
        buf.put_slice(&back[..n - head]);
        self.buffer.drain(..n);

        if let Some(waker) = self.write_waker.take() {
            waker.wake();
        }

        Poll::Ready(Ok(()))
    }

    fn poll_write(&mut self, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
        if self.reader_closed {
            return Poll::Ready(Err(closed_pipe()));
        }

        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let free = self.capacity - self.buffer.len();
        if free == 0 {
            self.write_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        let n = cmp::min(free, data.len());
        self.buffer.extend(&data[..n]);

        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }

        Poll::Ready(Ok(n))
    }

    fn close_write(&mut self) {
        self.writer_closed = true;
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }

    fn close_read(&mut self) {
        self.reader_closed = true;
        self.buffer.clear();
        if let Some(waker) = self.write_waker.take() {
            waker.wake();
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// One handle onto a duplex pipe.
///
/// Implements [`AsyncRead`] and [`AsyncWrite`], so it can stand in for a
/// `TcpStream` anywhere a generic stream is accepted. Dropping an endpoint
/// closes it.
pub struct Endpoint {
    side: Side,
    /// Bytes flowing towards this endpoint.
    inbound: Arc<Mutex<Pipe>>,
    /// Bytes flowing away from this endpoint.
    outbound: Arc<Mutex<Pipe>>,
    closed: bool,
}

/// Creates a connected pair of endpoints.
///
/// Returns `(server, client)`. Each direction buffers at most `capacity`
/// bytes before writers are suspended; a zero capacity is raised to one.
#[must_use]
pub fn pipe_pair(capacity: usize) -> (Endpoint, Endpoint) {
    let capacity = cmp::max(capacity, 1);
    let to_server = Arc::new(Mutex::new(Pipe::new(capacity)));
    let to_client = Arc::new(Mutex::new(Pipe::new(capacity)));

    let server = Endpoint {
        side: Side::Server,
        inbound: Arc::clone(&to_server),
        outbound: Arc::clone(&to_client),
        closed: false,
    };
    let client = Endpoint {
        side: Side::Client,
        inbound: to_client,
        outbound: to_server,
        closed: false,
    };

    (server, client)
}

impl Endpoint {
    /// Returns which end of the pair this is.
    #[inline]
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes this endpoint.
    ///
    /// The peer drains whatever is still buffered and then reads end of
    /// stream; the peer's writes fail from now on. Calling it again is a
    /// no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.outbound.lock().close_write();
        self.inbound.lock().close_read();

        debug!(side = %self.side, "Pipe endpoint closed");
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("side", &self.side)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for Endpoint {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.closed {
            return Poll::Ready(Err(use_of_closed()));
        }
        self.inbound.lock().poll_read(cx, buf)
    }
}

impl AsyncWrite for Endpoint {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.closed {
            return Poll::Ready(Err(use_of_closed()));
        }
        self.outbound.lock().poll_write(cx, data)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.closed {
            return Poll::Ready(Err(use_of_closed()));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().close();
        Poll::Ready(Ok(()))
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Error Helpers
// ============================================================================

fn use_of_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "use of closed connection")
}

fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "closed pipe")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_test::{assert_pending, assert_ready_ok, task};

    #[tokio::test]
    async fn test_client_to_server() {
        let (mut server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);

        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

        let mut buf = [0u8; 16];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn test_server_to_client() {
        let (mut server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);

        server.write_all(b"HTTP/1.1 101").await.unwrap();

        let mut buf = [0u8; 12];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"HTTP/1.1 101");
    }

    #[tokio::test]
    async fn test_large_write_crosses_small_buffer() {
        let (mut server, mut client) = pipe_pair(7);
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        let expected = payload.clone();
        let writer = tokio::spawn(async move {
            client.write_all(&payload).await.unwrap();
            client.close();
        });

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        writer.await.unwrap();

        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_peer_close_drains_then_eof() {
        let (mut server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);

        client.write_all(b"tail").await.unwrap();
        client.close();

        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"tail");

        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_close_wakes_pending_reader() {
        let (mut server, client) = pipe_pair(DEFAULT_PIPE_CAPACITY);

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 8];
            server.read(&mut buf).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(client);

        let n = tokio::time::timeout(Duration::from_secs(5), reader)
            .await
            .expect("reader should be woken")
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_write_after_local_close() {
        let (_server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        client.close();

        let err = client.write_all(b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert_eq!(err.to_string(), "use of closed connection");
    }

    #[tokio::test]
    async fn test_read_after_local_close() {
        let (mut server, _client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        server.close();

        let mut buf = [0u8; 1];
        let err = server.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn test_write_after_peer_close() {
        let (server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        drop(server);

        let err = client.write_all(b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut server, _client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        server.close();
        server.close();
        assert!(server.is_closed());

        server.shutdown().await.unwrap();
        assert!(server.is_closed());
    }

    #[test]
    fn test_full_buffer_applies_backpressure() {
        let (mut server, mut client) = pipe_pair(4);

        let mut write = task::spawn(client.write_all(b"abcdef"));
        assert_pending!(write.poll());

        let mut read = task::spawn(async {
            let mut buf = [0u8; 4];
            server.read_exact(&mut buf).await.map(|_| buf)
        });
        let buf = assert_ready_ok!(read.poll());
        assert_eq!(&buf, b"abcd");
        drop(read);

        assert!(write.is_woken());
        assert_ready_ok!(write.poll());
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (server, _client) = pipe_pair(0);
        assert_eq!(server.inbound.lock().capacity, 1);
    }

    #[test]
    fn test_sides() {
        let (server, client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        assert_eq!(server.side(), Side::Server);
        assert_eq!(client.side(), Side::Client);
        assert_eq!(client.side().to_string(), "client");
    }
}
