//! Markwhen LPC - request/response calls between a view and its host.
//!
//! This library lets two isolated execution contexts, such as an editor
//! host and an embedded timeline view, exchange typed messages over a
//! one-way channel while callers see ordinary request/response calls.
//!
//! # Architecture
//!
//! Each side runs one [`Lpc`] instance:
//!
//! - **Outbound**: [`Lpc::send_request`] registers a pending entry, then
//!   posts a request envelope on the selected transport
//! - **Inbound**: a router task classifies every message on the transport
//!   and either resolves a pending entry or runs the registered handler
//!
//! Key design principles:
//!
//! - One transport per instance, chosen once at construction
//! - Ids carry the `markwhen_` prefix; everything else on a shared channel
//!   is ignored
//! - Messages stamped with the local [`ContextId`] are own echoes and are
//!   ignored
//! - Nothing fails synchronously; an unanswered request just stays pending
//!
//! # Quick Start
//!
//! ```no_run
//! use markwhen_lpc::{Handlers, Lpc, Result, kind};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handlers = Handlers::new()
//!         .on::<kind::MarkwhenState, _, _>(|state| async move {
//!             println!("document: {:?}", state.and_then(|s| s.raw_text));
//!             None
//!         })
//!         .on_raw("ping", |_| async { Some(serde_json::json!("pong")) });
//!
//!     let lpc = Lpc::builder()
//!         .relay_url_from_env()
//!         .handlers(handlers)
//!         .connect()
//!         .await?;
//!
//!     let app = lpc.request::<kind::AppState>(None).await?;
//!     println!("dark mode: {:?}", app.and_then(|a| a.is_dark));
//!
//!     lpc.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`lpc`] | Instance, builder, handler registry |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Message and context ids |
//! | [`protocol`] | Envelope, type tags, payloads |
//! | [`transport`] | Relay, host and parent transports |

#![warn(missing_docs)]

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Message and context identifiers.
pub mod identifiers;

/// Request/response correlation.
///
/// Use [`Lpc::builder()`] to create a configured instance.
pub mod lpc;

/// Wire envelope and message types.
pub mod protocol;

/// Transports carrying envelopes between contexts.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Core types
pub use lpc::{HandlerFuture, Handlers, Lpc, LpcBuilder, RELAY_URL_ENV, ResponseFuture};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ContextId, MessageId, NonceSource, RandomNonce};

// Protocol types
pub use protocol::{
    AppState, DateRangeIso, DisplayScale, EditEventDateRange, Envelope, EnvelopeKind, EventPath,
    JumpToPath, JumpToRange, MarkwhenState, MessageKind, MessageType, NewEvent, SetText,
    TextRange, kind,
};

// Transport types
pub use transport::{
    HostTransport, MessageSink, ParentTransport, RawMessage, SocketTransport, TransportEvent,
    TransportKind, TransportProvider, Window,
};
