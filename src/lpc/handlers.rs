//! Handler registry.
//!
//! One optional handler per [`MessageType`]. A handler receives the
//! request params and produces the response params; the router wraps the
//! result into a response envelope with the request's id.
//!
//! # Example
//!
//! ```ignore
//! use markwhen_lpc::{Handlers, kind};
//!
//! let handlers = Handlers::new()
//!     .on::<kind::SetText, _, _>(|edit| async move {
//!         println!("new text: {}", edit.text);
//!     })
//!     .on_raw("ping", |_| async { Some(serde_json::json!("pong")) });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::protocol::{MessageKind, MessageType};

// ============================================================================
// Types
// ============================================================================

/// Future returned by an installed handler.
pub type HandlerFuture = BoxFuture<'static, Result<Option<Value>>>;

/// Type-erased handler.
///
/// Calling it runs the handler's synchronous part immediately; the
/// returned future carries the rest.
pub(crate) type BoxedHandler = Arc<dyn Fn(Option<Value>) -> HandlerFuture + Send + Sync>;

// ============================================================================
// Handlers
// ============================================================================

/// Handler registry supplied at construction.
#[derive(Clone, Default)]
pub struct Handlers {
    map: FxHashMap<MessageType, BoxedHandler>,
}

impl Handlers {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed handler for `K`.
    ///
    /// Params that do not decode as `K::Params` fail the request with
    /// [`Error::InvalidParams`]; no response is sent.
    #[must_use]
    pub fn on<K, F, Fut>(self, handler: F) -> Self
    where
        K: MessageKind,
        F: Fn(K::Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = K::Output> + Send + 'static,
    {
        let message_type = K::message_type();
        let tag = message_type.clone();

        let boxed: BoxedHandler = Arc::new(move |params: Option<Value>| {
            match serde_json::from_value::<K::Params>(params.unwrap_or(Value::Null)) {
                Ok(params) => {
                    let output = handler(params);
                    async move { encode_output(output.await) }.boxed()
                }
                Err(e) => future::ready(Err(Error::invalid_params(tag.clone(), e))).boxed(),
            }
        });

        self.insert(message_type, boxed)
    }

    /// Registers an untyped handler for any tag, including custom ones.
    ///
    /// Returning `None` sends a response without params.
    #[must_use]
    pub fn on_raw<F, Fut>(self, message_type: impl Into<MessageType>, handler: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Value>> + Send + 'static,
    {
        let boxed: BoxedHandler = Arc::new(move |params: Option<Value>| {
            handler(params).map(Ok::<_, Error>).boxed()
        });

        self.insert(message_type.into(), boxed)
    }

    /// Returns `true` if a handler is registered for `message_type`.
    #[inline]
    #[must_use]
    pub fn contains(&self, message_type: &MessageType) -> bool {
        self.map.contains_key(message_type)
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no handler is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Looks up the handler for `message_type`.
    pub(crate) fn get(&self, message_type: &MessageType) -> Option<BoxedHandler> {
        self.map.get(message_type).cloned()
    }

    fn insert(mut self, message_type: MessageType, handler: BoxedHandler) -> Self {
        if self.map.insert(message_type.clone(), handler).is_some() {
            warn!(%message_type, "Handler replaced");
        }
        self
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

/// Encodes a handler output; `null` becomes absent params.
fn encode_output<T: serde::Serialize>(output: T) -> Result<Option<Value>> {
    let value = serde_json::to_value(output)?;
    Ok((!value.is_null()).then_some(value))
}

// ============================================================================
// Tests
// ============================================================================
