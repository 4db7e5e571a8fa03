//! Request/response correlation.
//!
//! This module turns a one-way message channel into request/response
//! calls: outbound requests wait on a pending entry keyed by their id,
//! inbound requests are answered by registered handlers.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Lpc`] | Instance handle: send requests, close |
//! | [`LpcBuilder`] | Explicit environment configuration |
//! | [`Handlers`] | Handler registry, one handler per message type |
//! | [`ResponseFuture`] | Pending response to one request |
//!
//! # Example
//!
//! ```no_run
//! use markwhen_lpc::{Handlers, Lpc, kind};
//!
//! # async fn example() -> markwhen_lpc::Result<()> {
//! let handlers = Handlers::new()
//!     .on::<kind::JumpToPath, _, _>(|jump| async move {
//!         println!("jump to {:?}", jump.path);
//!     });
//!
//! let lpc = Lpc::builder()
//!     .relay_url("ws://127.0.0.1:7237")
//!     .handlers(handlers)
//!     .connect()
//!     .await?;
//!
//! let app = lpc.request::<kind::AppState>(None).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for instance configuration.
pub mod builder;

/// Core instance implementation.
pub mod core;

/// Handler registry.
pub mod handlers;

mod pending;
mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::builder::{LpcBuilder, RELAY_URL_ENV};
pub use self::core::{Lpc, ResponseFuture};
pub use self::handlers::{HandlerFuture, Handlers};
