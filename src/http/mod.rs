//! HTTP side of the handshake.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `request` | Parses the upgrade request off the server endpoint |
//! | `response` | Response writer and hijack capability for handlers |
//! | `upgrade` | Server-side WebSocket upgrade over a hijacked stream |

// ============================================================================
// Submodules
// ============================================================================

/// Upgrade request parsing.
pub mod request;

/// Response writer.
pub mod response;

/// Server-side upgrade.
pub mod upgrade;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::read_request;
pub use response::ResponseWriter;
pub use upgrade::Upgrader;
