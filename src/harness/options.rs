//! Harness configuration.

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::tungstenite::http::HeaderMap;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::transport::DEFAULT_PIPE_CAPACITY;

// ============================================================================
// Constants
// ============================================================================

/// URL the client handshake is addressed to. Only its path and `Host`
/// reach the handler; nothing is resolved.
pub const DEFAULT_URL: &str = "ws://ws";

// ============================================================================
// HarnessOptions
// ============================================================================

/// Validated harness configuration.
///
/// Produced by [`HarnessBuilder`](super::HarnessBuilder); the defaults are
/// what [`Harness::new`](super::Harness::new) uses.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Bytes each pipe direction buffers before writers suspend.
    pub pipe_capacity: usize,

    /// Handshake request URL.
    pub url: String,

    /// Extra headers sent with the handshake request.
    pub headers: HeaderMap,

    /// Client-side session limits.
    pub websocket: Option<WebSocketConfig>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            url: DEFAULT_URL.to_string(),
            headers: HeaderMap::new(),
            websocket: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
