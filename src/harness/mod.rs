//! Harness orchestrator.
//!
//! # Connection Lifecycle
//!
//! 1. `Harness::new` / `Harness::builder` - Allocate the pipe pair
//! 2. `Harness::connect` - Spawn the handler on the server endpoint and
//!    perform the client handshake on the client endpoint
//! 3. `Harness::send` / `Harness::receive` - Exchange messages
//! 4. `Harness::close` - Send a close frame and release the client endpoint
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent harness configuration |
//! | `core` | The `Harness` itself |
//! | `handler` | Handler trait and handler task |
//! | `options` | Validated configuration values |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for harness configuration.
pub mod builder;

/// Core harness implementation.
pub mod core;

/// Handler capability.
pub mod handler;

/// Harness configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::HarnessBuilder;
pub use core::{Harness, HarnessState};
pub use handler::Handler;
pub use options::HarnessOptions;
