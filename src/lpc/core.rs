//! LPC instance.
//!
//! [`Lpc`] owns the selected transport, the pending-request table and the
//! handler registry. It is cheap to clone; all clones share one instance.
//!
//! # Example
//!
//! ```no_run
//! use markwhen_lpc::{Handlers, Lpc, kind};
//!
//! # async fn example() -> markwhen_lpc::Result<()> {
//! let lpc = Lpc::builder()
//!     .relay_url("ws://127.0.0.1:7237")
//!     .handlers(Handlers::new().on::<kind::SetText, _, _>(|edit| async move {
//!         println!("{}", edit.text);
//!     }))
//!     .connect()
//!     .await?;
//!
//! let state = lpc.request::<kind::MarkwhenState>(None).await?;
//! lpc.close();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::identifiers::{ContextId, MessageId, NonceSource};
use crate::protocol::{Envelope, MessageKind, MessageType};
use crate::transport::{EventReceiver, TransportKind, TransportProvider, Window};

use super::builder::LpcBuilder;
use super::handlers::Handlers;
use super::pending::PendingTable;
use super::router;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an instance.
pub(crate) struct LpcInner {
    /// Context this instance receives on.
    window: Arc<Window>,

    /// Selected transport, if any.
    transport: Option<Arc<dyn TransportProvider>>,

    /// Outstanding requests.
    pub pending: PendingTable,

    /// Inbound request handlers.
    pub handlers: Handlers,

    /// Source of request id nonces.
    nonce: Arc<dyn NonceSource>,

    /// Set once `close` has run.
    closed: AtomicBool,

    /// Task draining transport events.
    router: Mutex<Option<JoinHandle<()>>>,
}

impl LpcInner {
    /// Returns the local context id.
    #[inline]
    pub(crate) fn context_id(&self) -> ContextId {
        self.window.id()
    }

    /// Hands an envelope to the transport.
    ///
    /// Failures are logged, never returned: the sender of a request learns
    /// about them only through a response that never comes.
    pub(crate) fn post(&self, envelope: &Envelope) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(id = %envelope.id, "Instance closed, message dropped");
            return;
        }

        let Some(transport) = &self.transport else {
            error!(id = %envelope.id, error = %Error::NoTransport, "Nothing to post to");
            return;
        };

        match transport.post(envelope) {
            Ok(()) => trace!(
                id = %envelope.id,
                message_type = %envelope.message_type,
                transport = %transport.kind(),
                "Envelope posted"
            ),
            Err(e) => error!(id = %envelope.id, error = %e, "Failed to post envelope"),
        }
    }

    /// Registers a pending entry, then posts the request.
    pub(crate) fn send_request(
        &self,
        message_type: MessageType,
        params: Option<Value>,
    ) -> ResponseFuture {
        let id = MessageId::generate_with(self.nonce.as_ref());
        let (tx, rx) = oneshot::channel();

        self.pending.insert(id.clone(), tx);
        self.post(&Envelope::request(message_type, id.clone(), params));

        ResponseFuture { id, rx }
    }

    /// Posts the response to request `id`.
    pub(crate) fn send_response(
        &self,
        id: MessageId,
        message_type: MessageType,
        params: Option<Value>,
    ) {
        self.post(&Envelope::response(message_type, id, params));
    }

    /// Releases the transport and stops the router.
    ///
    /// Returns `false` if already shut down.
    fn shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Some(transport) = &self.transport {
            transport.close();
        }

        if let Some(task) = self.router.lock().take() {
            task.abort();
        }

        true
    }
}

impl Drop for LpcInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Lpc
// ============================================================================

/// Request/response endpoint bound to one transport.
///
/// Construct with [`Lpc::builder`]. The transport is chosen once, at
/// construction, and never changes afterwards.
#[derive(Clone)]
pub struct Lpc {
    pub(crate) inner: Arc<LpcInner>,
}

impl fmt::Debug for Lpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lpc")
            .field("context_id", &self.context_id())
            .field("transport", &self.transport_kind())
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Lpc - Public API
// ============================================================================

impl Lpc {
    /// Creates a builder for configuring an instance.
    #[inline]
    #[must_use]
    pub fn builder() -> LpcBuilder {
        LpcBuilder::new()
    }

    /// Sends a request and returns a future for its response.
    ///
    /// The request is posted before this returns; the future only waits.
    /// With no transport, or a transport that is not ready, the request
    /// is dropped and the future stays pending.
    pub fn send_request(
        &self,
        message_type: impl Into<MessageType>,
        params: Option<Value>,
    ) -> ResponseFuture {
        self.inner.send_request(message_type.into(), params)
    }

    /// Sends a typed request and decodes the response params.
    ///
    /// Posted eagerly, like [`send_request`](Self::send_request).
    pub fn request<K: MessageKind>(
        &self,
        params: K::Params,
    ) -> impl Future<Output = Result<K::Output>> + Send + use<K> {
        let sent = self.send_typed::<K>(params);

        async move { sent?.await?.decode::<K::Output>() }
    }

    /// Sends a typed request that fails after `timeout`.
    ///
    /// On timeout the pending entry is removed, so a late response is
    /// dropped as unmatched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestTimeout`] if no response arrives in time.
    pub fn request_with_timeout<K: MessageKind>(
        &self,
        params: K::Params,
        timeout: Duration,
    ) -> impl Future<Output = Result<K::Output>> + Send + use<K> {
        let inner = Arc::downgrade(&self.inner);
        let sent = self.send_typed::<K>(params);

        async move {
            let response = sent?;
            let id = response.id().clone();

            match tokio::time::timeout(timeout, response).await {
                Ok(envelope) => envelope?.decode::<K::Output>(),
                Err(_) => {
                    if let Some(inner) = inner.upgrade() {
                        inner.pending.remove(&id);
                    }
                    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                    Err(Error::request_timeout(id, timeout_ms))
                }
            }
        }
    }

    /// Releases the transport. Safe to call more than once.
    ///
    /// Requests still pending are not rejected; they fail with
    /// [`Error::ChannelClosed`] once the last handle is dropped.
    pub fn close(&self) {
        if self.inner.shutdown() {
            debug!(context = %self.context_id(), "Instance closed");
        }
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Returns `true` if posts currently reach a peer.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.is_closed()
            && self
                .inner
                .transport
                .as_ref()
                .is_some_and(|transport| transport.is_ready())
    }

    /// Returns the selected transport, if any.
    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.inner.transport.as_ref().map(|transport| transport.kind())
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Returns `true` if the request `id` is awaiting a response.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.inner.pending.contains(id)
    }

    /// Returns the local context id stamped on posted messages.
    #[inline]
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.inner.context_id()
    }

    /// Returns the context this instance receives on.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &Arc<Window> {
        &self.inner.window
    }
}

// ============================================================================
// Lpc - Internal
// ============================================================================

impl Lpc {
    /// Assembles an instance and starts routing transport events.
    pub(crate) fn start(
        window: Arc<Window>,
        transport: Option<Arc<dyn TransportProvider>>,
        handlers: Handlers,
        nonce: Arc<dyn NonceSource>,
        events: EventReceiver,
    ) -> Self {
        let inner = Arc::new(LpcInner {
            window,
            transport,
            pending: PendingTable::default(),
            handlers,
            nonce,
            closed: AtomicBool::new(false),
            router: Mutex::new(None),
        });

        if inner.transport.is_some() {
            let task = tokio::spawn(router::run(Arc::downgrade(&inner), events));
            *inner.router.lock() = Some(task);
        }

        Self { inner }
    }

    /// Encodes typed params and sends the request.
    fn send_typed<K: MessageKind>(&self, params: K::Params) -> Result<ResponseFuture> {
        let params = serde_json::to_value(params)?;
        let params = (!params.is_null()).then_some(params);
        Ok(self.send_request(K::message_type(), params))
    }
}

// ============================================================================
// ResponseFuture
// ============================================================================

/// Future resolving to the response envelope of one request.
///
/// Dropping it does not cancel the request; the response is discarded
/// when it arrives.
#[must_use = "the response is lost unless the future is awaited"]
#[derive(Debug)]
pub struct ResponseFuture {
    id: MessageId,
    rx: oneshot::Receiver<Envelope>,
}

impl ResponseFuture {
    /// Returns the correlation id of the request.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Envelope>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| result.map_err(Error::from))
    }
}

// ============================================================================
// Tests
// ============================================================================
