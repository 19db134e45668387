//! Handler capability and the task that runs it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio_tungstenite::tungstenite::http::Request;
use tracing::{debug, warn};

use crate::http::{ResponseWriter, read_request};
use crate::transport::Endpoint;

// ============================================================================
// Handler
// ============================================================================

/// Server-side request handler under test.
///
/// Invoked once per [`Harness::connect`](super::Harness::connect), in its own
/// task, with the request parsed from the server endpoint. Upgrade with
/// [`Upgrader`](crate::Upgrader), take the raw stream with
/// [`ResponseWriter::hijack`], or record an ordinary response.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    async fn serve(&self, writer: &mut ResponseWriter, request: Request<()>);
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn serve(&self, writer: &mut ResponseWriter, request: Request<()>) {
        (**self).serve(writer, request).await;
    }
}

// ============================================================================
// Handler Execution
// ============================================================================

/// Reads the request off `endpoint`, runs `handler`, then flushes the
/// recorded response unless the handler hijacked the connection.
///
/// Errors end the task; they are logged, not reported to the harness.
pub(crate) async fn run<H: Handler>(handler: H, endpoint: Endpoint, hijacked: Arc<AtomicBool>) {
    let mut reader = BufReader::new(endpoint);

    let request = match read_request(&mut reader).await {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Failed to read upgrade request");
            return;
        }
    };

    debug!(method = %request.method(), uri = %request.uri(), "Invoking handler");

    let mut writer = ResponseWriter::new(reader, hijacked);
    handler.serve(&mut writer, request).await;

    if let Err(e) = writer.finish().await {
        debug!(error = %e, "Failed to send recorded response");
    }

    debug!("Handler finished");
}
