//! Builder pattern for instance configuration.
//!
//! Everything the instance needs from its environment is passed in here
//! explicitly: the relay address, the host and parent capabilities, the
//! pre-seeded state and the handler registry.
//!
//! # Transport Priority
//!
//! | Configured | Transport |
//! |------------|-----------|
//! | relay URL | [`SocketTransport`] |
//! | host sink | [`HostTransport`] |
//! | parent sink | [`ParentTransport`] |
//! | nothing | none, sends are logged and dropped |
//!
//! Only the first configured transport is used.
//!
//! # Example
//!
//! ```no_run
//! use markwhen_lpc::Lpc;
//!
//! # async fn example() -> markwhen_lpc::Result<()> {
//! let lpc = Lpc::builder()
//!     .relay_url_from_env()
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{NonceSource, RandomNonce};
use crate::protocol::{MarkwhenState, MessageType};
use crate::transport::{
    EventSender, HostTransport, MessageSink, ParentTransport, SocketTransport, TransportProvider,
    Window,
};

use super::core::Lpc;
use super::handlers::Handlers;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable advertising the relay address.
pub const RELAY_URL_ENV: &str = "MARKWHEN_WSS_URL";

/// Schemes accepted for the relay address.
const RELAY_SCHEMES: [&str; 2] = ["ws", "wss"];

// ============================================================================
// LpcBuilder
// ============================================================================

/// Builder for configuring an [`Lpc`] instance.
///
/// Use [`Lpc::builder()`] to create a new builder.
#[derive(Default)]
pub struct LpcBuilder {
    /// Relay address, unvalidated.
    relay_url: Option<String>,
    /// Host-embedding capability.
    host: Option<Arc<dyn MessageSink>>,
    /// Enclosing context.
    parent: Option<Arc<dyn MessageSink>>,
    /// Local context.
    window: Option<Arc<Window>>,
    /// Pre-seeded document state.
    initial_state: Option<MarkwhenState>,
    /// Inbound request handlers.
    handlers: Handlers,
    /// Request id nonces.
    nonce: Option<Arc<dyn NonceSource>>,
}

// ============================================================================
// LpcBuilder Implementation
// ============================================================================

impl LpcBuilder {
    /// Creates a builder with nothing configured.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relay address.
    ///
    /// An empty string leaves the relay unset.
    #[inline]
    #[must_use]
    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.relay_url = (!url.is_empty()).then_some(url);
        self
    }

    /// Reads the relay address from [`RELAY_URL_ENV`].
    ///
    /// Leaves the current setting untouched if the variable is absent or
    /// empty.
    #[must_use]
    pub fn relay_url_from_env(self) -> Self {
        match env::var(RELAY_URL_ENV) {
            Ok(url) if !url.is_empty() => self.relay_url(url),
            _ => self,
        }
    }

    /// Sets the host-embedding capability.
    #[inline]
    #[must_use]
    pub fn host(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.host = Some(sink);
        self
    }

    /// Sets the enclosing context.
    #[inline]
    #[must_use]
    pub fn parent(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.parent = Some(sink);
        self
    }

    /// Sets the local context. A fresh [`Window`] is used otherwise.
    #[inline]
    #[must_use]
    pub fn window(mut self, window: Arc<Window>) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets the pre-seeded document state.
    ///
    /// Delivered to the `markwhenState` handler during
    /// [`connect`](Self::connect), before any transport exists.
    #[inline]
    #[must_use]
    pub fn initial_state(mut self, state: MarkwhenState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Sets the handler registry.
    #[inline]
    #[must_use]
    pub fn handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Replaces the nonce source used for request ids.
    #[inline]
    #[must_use]
    pub fn nonce_source(mut self, source: Arc<dyn NonceSource>) -> Self {
        self.nonce = Some(source);
        self
    }

    /// Builds the instance.
    ///
    /// Runs the initial-state handler, then selects and starts the
    /// transport. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the relay address does not parse
    /// - [`Error::Config`] if the relay address is not `ws` or `wss`
    /// - [`Error::Json`] if the initial state cannot be encoded
    pub async fn connect(self) -> Result<Lpc> {
        let relay_url = self.validate_relay_url()?;

        let Self {
            host,
            parent,
            window,
            initial_state,
            handlers,
            nonce,
            ..
        } = self;

        let window = window.unwrap_or_default();
        let nonce = nonce.unwrap_or_else(|| Arc::new(RandomNonce));

        if let Some(state) = initial_state {
            deliver_initial_state(&handlers, state).await?;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = select_transport(relay_url, host, parent, &window, events_tx);

        Ok(Lpc::start(window, transport, handlers, nonce, events_rx))
    }
}

impl fmt::Debug for LpcBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LpcBuilder")
            .field("relay_url", &self.relay_url)
            .field("host", &self.host.is_some())
            .field("parent", &self.parent.is_some())
            .field("window", &self.window)
            .field("initial_state", &self.initial_state.is_some())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Validation
// ============================================================================

impl LpcBuilder {
    /// Validates the relay address, if one is set.
    fn validate_relay_url(&self) -> Result<Option<Url>> {
        let Some(raw) = &self.relay_url else {
            return Ok(None);
        };

        let url = Url::parse(raw)?;

        if !RELAY_SCHEMES.contains(&url.scheme()) {
            return Err(Error::config(format!(
                "Relay URL must use ws:// or wss://, got {}://.\n\
                 Example: Lpc::builder().relay_url(\"ws://127.0.0.1:7237\")",
                url.scheme()
            )));
        }

        Ok(Some(url))
    }
}

// ============================================================================
// Startup
// ============================================================================

/// Feeds the pre-seeded state to the `markwhenState` handler.
async fn deliver_initial_state(handlers: &Handlers, state: MarkwhenState) -> Result<()> {
    let Some(handler) = handlers.get(&MessageType::MarkwhenState) else {
        debug!("Initial state present, no handler registered");
        return Ok(());
    };

    let params = serde_json::to_value(state)?;

    if let Err(e) = handler(Some(params)).await {
        warn!(error = %e, "Initial state handler failed");
    }

    Ok(())
}

/// Picks the first configured transport.
fn select_transport(
    relay_url: Option<Url>,
    host: Option<Arc<dyn MessageSink>>,
    parent: Option<Arc<dyn MessageSink>>,
    window: &Window,
    events: EventSender,
) -> Option<Arc<dyn TransportProvider>> {
    if let Some(url) = relay_url {
        info!(%url, "Using relay transport");
        return Some(Arc::new(SocketTransport::connect(url, events)));
    }

    if let Some(host) = host {
        return Some(Arc::new(HostTransport::new(host, window, events)));
    }

    if let Some(parent) = parent {
        return Some(Arc::new(ParentTransport::new(parent, window, events)));
    }

    warn!("No transport available, requests will not be sent");
    None
}

// ============================================================================
// Tests
// ============================================================================
