//! Transport layer.
//!
//! A transport moves envelopes between this context and its peer. Exactly
//! one is selected when an [`Lpc`](crate::Lpc) is built and it is used for
//! the instance's whole life.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      SocketTransport       ┌────────────────┐
//! │              │◄──────────────────────────►│ Relay          │
//! │  Lpc         │                            └────────────────┘
//! │  → Transport │      HostTransport         ┌────────────────┐
//! │  → Router    │◄──────────────────────────►│ Host           │
//! │              │                            └────────────────┘
//! │              │      ParentTransport       ┌────────────────┐
//! │              │◄──────────────────────────►│ Parent context │
//! └──────────────┘                            └────────────────┘
//! ```
//!
//! Outbound envelopes go through [`TransportProvider::post`]. Inbound
//! traffic arrives on the [`EventSender`] the transport was built with, as
//! [`TransportEvent`]s consumed by the router task.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `host` | Host-embedding message API |
//! | `parent` | Enclosing context's message API |
//! | `socket` | WebSocket connection to a relay |
//! | `window` | Local message target and listener guard |

// ============================================================================
// Submodules
// ============================================================================

/// Host-embedding transport.
pub mod host;

/// Parent-context transport.
pub mod parent;

/// WebSocket relay transport.
pub mod socket;

/// Window-style message channels.
pub mod window;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::Envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use host::HostTransport;
pub use parent::ParentTransport;
pub use socket::SocketTransport;
pub use window::{MessageSink, Window};

// ============================================================================
// Types
// ============================================================================

/// Channel on which a transport reports inbound activity.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half of [`EventSender`].
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// A raw inbound or outbound message before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// Structured payload.
    pub data: Value,
    /// Declared origin, if the channel carries one.
    pub source: Option<ContextId>,
}

impl RawMessage {
    /// Creates a raw message.
    #[inline]
    #[must_use]
    pub fn new(data: Value, source: Option<ContextId>) -> Self {
        Self { data, source }
    }
}

/// Activity reported by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Transport became ready to send.
    Opened,
    /// A message arrived.
    Message(RawMessage),
    /// Transport stopped delivering.
    Closed,
}

/// Which transport an instance selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// WebSocket connection to a relay.
    Socket,
    /// Host-embedding message API.
    Host,
    /// Enclosing context's message API.
    Parent,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Socket => "socket",
            Self::Host => "host",
            Self::Parent => "parent",
        })
    }
}

// ============================================================================
// TransportProvider
// ============================================================================

/// A duplex channel to the peer.
///
/// Implementations must be cheap to call from the router task: `post`
/// never waits for the peer.
pub trait TransportProvider: Send + Sync {
    /// Returns which transport this is.
    fn kind(&self) -> TransportKind;

    /// Returns `true` if [`post`](Self::post) will transmit.
    fn is_ready(&self) -> bool;

    /// Transmits an envelope.
    ///
    /// A transport that is not ready drops the envelope and returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be encoded or handed to the
    /// underlying channel.
    fn post(&self, envelope: &Envelope) -> Result<()>;

    /// Releases the channel and any inbound listener. Idempotent.
    fn close(&self);
}

// ============================================================================
// Tests
// ============================================================================
