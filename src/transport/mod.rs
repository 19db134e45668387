//! In-memory transport layer.
//!
//! This module replaces the TCP connection a WebSocket client and server
//! would normally share with an in-process duplex pipe.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Test (client)  │                              │  Handler task   │
//! │                 │        pipe_pair()           │  (server)       │
//! │  Endpoint-C     │◄────────────────────────────►│  Endpoint-S     │
//! │                 │    two bounded buffers       │  → Hijacked     │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `pipe` | Duplex pipe pair and its endpoints |
//! | `hijack` | Raw stream handed out by a hijack |

// ============================================================================
// Submodules
// ============================================================================

/// Duplex pipe pair.
pub mod pipe;

/// Hijacked server-facing stream.
pub mod hijack;

// ============================================================================
// Re-exports
// ============================================================================

pub use hijack::Hijacked;
pub use pipe::{DEFAULT_PIPE_CAPACITY, Endpoint, Side, pipe_pair};
