//! Upgrade request parsing.
//!
//! Reads an HTTP/1.x request head off the server-facing stream. Only the
//! head is consumed; whatever follows it stays in the reader's buffer so a
//! hijacking handler still sees it.

// ============================================================================
// Imports
// ============================================================================

use httparse::Status;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_tungstenite::tungstenite::http::{Request, Version};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of request headers.
const MAX_HEADERS: usize = 64;

/// Maximum size of the request line plus headers.
const MAX_HEAD_SIZE: usize = 16 * 1024;

// ============================================================================
// read_request
// ============================================================================

/// Reads one request head from `reader`.
///
/// Suspends until the blank line ending the headers has arrived.
///
/// # Errors
///
/// - [`Error::ConnectionClosed`] if the stream ends before the head is complete
/// - [`Error::Protocol`] if the head is malformed or larger than 16 KiB
/// - [`Error::Io`] if reading fails
pub async fn read_request<R>(reader: &mut R) -> Result<Request<()>>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(Error::ConnectionClosed);
        }

        let already = head.len();
        let taken = available.len();
        head.extend_from_slice(available);

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut parsed = httparse::Request::new(&mut headers);

        match parsed.parse(&head) {
            Ok(Status::Complete(len)) => {
                if len > MAX_HEAD_SIZE {
                    return Err(head_too_large());
                }
                let request = build_request(&parsed)?;
                reader.consume(len - already);
                return Ok(request);
            }
            Ok(Status::Partial) => {
                if head.len() > MAX_HEAD_SIZE {
                    return Err(head_too_large());
                }
                reader.consume(taken);
            }
            Err(e) => return Err(Error::protocol(format!("malformed request: {e}"))),
        }
    }
}

/// Converts a complete `httparse` request into an `http::Request`.
fn head_too_large() -> Error {
    Error::protocol(format!("request head exceeds {MAX_HEAD_SIZE} bytes"))
}

fn build_request(parsed: &httparse::Request<'_, '_>) -> Result<Request<()>> {
    let method = parsed
        .method
        .ok_or_else(|| Error::protocol("request method missing"))?;
    let path = parsed
        .path
        .ok_or_else(|| Error::protocol("request target missing"))?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut builder = Request::builder().method(method).uri(path).version(version);
    for header in parsed.headers.iter() {
        builder = builder.header(header.name, header.value);
    }

    builder
        .body(())
        .map_err(|e| Error::protocol(format!("invalid request: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio_tungstenite::tungstenite::http::Method;
    use tokio_tungstenite::tungstenite::http::header::{HOST, UPGRADE};

    use crate::transport::{DEFAULT_PIPE_CAPACITY, pipe_pair};

    const UPGRADE_HEAD: &[u8] = b"GET /chat?room=1 HTTP/1.1\r\n\
        Host: ws\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\r\n";

    #[tokio::test]
    async fn test_parses_upgrade_request() {
        let (server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        client.write_all(UPGRADE_HEAD).await.unwrap();

        let mut reader = BufReader::new(server);
        let request = read_request(&mut reader).await.unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/chat");
        assert_eq!(request.uri().query(), Some("room=1"));
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers()[HOST], "ws");
        assert_eq!(request.headers()[UPGRADE], "websocket");
    }

    #[tokio::test]
    async fn test_head_split_across_writes() {
        let (server, mut client) = pipe_pair(8);

        let writer = tokio::spawn(async move {
            for chunk in UPGRADE_HEAD.chunks(5) {
                client.write_all(chunk).await.unwrap();
            }
            client
        });

        let mut reader = BufReader::new(server);
        let request = read_request(&mut reader).await.unwrap();
        let _client = writer.await.unwrap();

        assert_eq!(request.uri().path(), "/chat");
    }

    #[tokio::test]
    async fn test_leaves_trailing_bytes_buffered() {
        let (server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        client.write_all(UPGRADE_HEAD).await.unwrap();
        client.write_all(b"early").await.unwrap();
        client.close();

        let mut reader = BufReader::new(server);
        read_request(&mut reader).await.unwrap();

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"early");
    }

    #[tokio::test]
    async fn test_eof_before_complete_head() {
        let (server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        client.write_all(b"GET / HTTP/1.1\r\nHost: ws\r\n").await.unwrap();
        client.close();

        let mut reader = BufReader::new(server);
        let err = read_request(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let (server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);
        client.write_all(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").await.unwrap();

        let mut reader = BufReader::new(server);
        let err = read_request(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_complete_head_over_limit_rejected() {
        let (server, mut client) = pipe_pair(64 * 1024);

        let mut head = b"GET / HTTP/1.1\r\nHost: ws\r\n".to_vec();
        let filler = format!("X-Filler: {}\r\n", "a".repeat(1000));
        for _ in 0..22 {
            head.extend_from_slice(filler.as_bytes());
        }
        head.extend_from_slice(b"\r\n");
        assert!(head.len() > MAX_HEAD_SIZE + 4096);

        client.write_all(&head).await.unwrap();

        let mut reader = BufReader::new(server);
        let err = read_request(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(err.to_string().contains("exceeds"));
    }

    #[tokio::test]
    async fn test_head_at_limit_accepted() {
        let (server, mut client) = pipe_pair(64 * 1024);

        let mut head = b"GET / HTTP/1.1\r\nHost: ws\r\nX-Pad: ".to_vec();
        let pad = MAX_HEAD_SIZE - head.len() - 4;
        head.extend(std::iter::repeat_n(b'a', pad));
        head.extend_from_slice(b"\r\n\r\n");
        assert_eq!(head.len(), MAX_HEAD_SIZE);

        client.write_all(&head).await.unwrap();

        let mut reader = BufReader::new(server);
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.headers()["x-pad"].len(), pad);
    }

    #[tokio::test]
    async fn test_oversized_head() {
        let (server, mut client) = pipe_pair(DEFAULT_PIPE_CAPACITY);

        let writer = tokio::spawn(async move {
            client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
            let filler = format!("X-Filler: {}\r\n", "a".repeat(1000));
            for _ in 0..20 {
                if client.write_all(filler.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        let mut reader = BufReader::new(server);
        let err = read_request(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        drop(reader);
        writer.await.unwrap();
    }
}
