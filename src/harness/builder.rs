//! Builder pattern for harness configuration.
//!
//! Provides a fluent API for configuring and creating [`Harness`] instances.
//!
//! # Example
//!
//! ```no_run
//! use wstest::Harness;
//!
//! # fn example() -> wstest::Result<()> {
//! let harness = Harness::builder()
//!     .pipe_capacity(64)
//!     .url("ws://ws/chat")
//!     .header("Origin", "http://localhost")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use url::Url;

use crate::error::{Error, Result};

use super::core::Harness;
use super::options::{DEFAULT_URL, HarnessOptions};

// ============================================================================
// HarnessBuilder
// ============================================================================

/// Builder for configuring a [`Harness`] instance.
///
/// Use [`Harness::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct HarnessBuilder {
    /// Per-direction pipe capacity.
    pipe_capacity: Option<usize>,
    /// Handshake URL.
    url: Option<String>,
    /// Extra handshake headers, validated on build.
    headers: Vec<(String, String)>,
    /// Client-side session limits.
    websocket: Option<WebSocketConfig>,
}

// ============================================================================
// HarnessBuilder Implementation
// ============================================================================

impl HarnessBuilder {
    /// Creates a new builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many bytes each pipe direction buffers.
    ///
    /// Small values make both sides hit backpressure early.
    #[inline]
    #[must_use]
    pub fn pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = Some(capacity);
        self
    }

    /// Sets the handshake request URL (default `ws://ws`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Adds a header to the handshake request.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the client-side session configuration.
    #[inline]
    #[must_use]
    pub fn websocket_config(mut self, config: WebSocketConfig) -> Self {
        self.websocket = Some(config);
        self
    }

    /// Builds the harness with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the pipe capacity is zero
    /// - [`Error::Config`] if the URL does not parse or is not `ws://`
    /// - [`Error::Config`] if a header name or value is invalid
    pub fn build(self) -> Result<Harness> {
        let options = self.into_options()?;
        Ok(Harness::with_options(options))
    }

    /// Validates the builder into options.
    pub(crate) fn into_options(self) -> Result<HarnessOptions> {
        let pipe_capacity = self.validate_capacity()?;
        let url = self.validate_url()?;
        let headers = self.validate_headers()?;

        Ok(HarnessOptions {
            pipe_capacity,
            url,
            headers,
            websocket: self.websocket,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl HarnessBuilder {
    /// Validates the pipe capacity.
    fn validate_capacity(&self) -> Result<usize> {
        let capacity = self
            .pipe_capacity
            .unwrap_or(HarnessOptions::default().pipe_capacity);

        if capacity == 0 {
            return Err(Error::config(
                "Pipe capacity must be at least 1 byte.\n\
                 Example: Harness::builder().pipe_capacity(1024)",
            ));
        }

        Ok(capacity)
    }

    /// Validates the handshake URL.
    fn validate_url(&self) -> Result<String> {
        let raw = self.url.as_deref().unwrap_or(DEFAULT_URL);

        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid handshake URL '{raw}': {e}")))?;

        if url.scheme() != "ws" {
            return Err(Error::config(format!(
                "Unsupported URL scheme '{}': only ws:// is supported",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(Error::config(format!("Handshake URL '{raw}' has no host")));
        }

        Ok(url.into())
    }

    /// Validates the extra handshake headers.
    fn validate_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("Invalid value for header '{name}': {e}")))?;
            headers.append(header_name, header_value);
        }

        Ok(headers)
    }
}

// ============================================================================
// Tests
// ============================================================================
