//! Type-safe identifiers.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`MessageId`] | Correlation token carried by a request and echoed by its response |
//! | [`ContextId`] | Identity of an execution context, used as a message origin |
//!
//! Message ids are the protocol prefix followed by a 32-character nonce
//! over `[A-Za-z0-9]`. Nonces come from a [`NonceSource`]; the default
//! [`RandomNonce`] draws from the thread-local CSPRNG.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Prefix shared by every id this protocol generates.
pub const ID_PREFIX: &str = "markwhen_";

/// Number of nonce characters following [`ID_PREFIX`].
pub const NONCE_LEN: usize = 32;

// ============================================================================
// NonceSource
// ============================================================================

/// Produces the unique part of a [`MessageId`].
///
/// Implementations must return strings that do not repeat among
/// concurrently pending requests.
pub trait NonceSource: Send + Sync {
    /// Returns a fresh nonce.
    fn nonce(&self) -> String;
}

/// Default nonce source backed by `rand::thread_rng`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn nonce(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect()
    }
}

// ============================================================================
// MessageId
// ============================================================================

/// Correlation id linking a request envelope to its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generates a new id from the default nonce source.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self::from_nonce(&RandomNonce.nonce())
    }

    /// Generates a new id from the given nonce source.
    #[inline]
    #[must_use]
    pub fn generate_with(source: &dyn NonceSource) -> Self {
        Self::from_nonce(&source.nonce())
    }

    /// Builds an id by prefixing `nonce`.
    #[inline]
    #[must_use]
    pub fn from_nonce(nonce: &str) -> Self {
        Self(format!("{ID_PREFIX}{nonce}"))
    }

    /// Wraps a raw id if it carries the protocol prefix.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::is_protocol_id(raw).then(|| Self(raw.to_string()))
    }

    /// Returns `true` if `raw` belongs to this protocol.
    #[inline]
    #[must_use]
    pub fn is_protocol_id(raw: &str) -> bool {
        raw.starts_with(ID_PREFIX)
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ContextId
// ============================================================================

/// Identity of an execution context (a window, a host, a relay peer).
///
/// Attached as the source of every message posted through a window-style
/// channel so that a context can recognise its own broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Creates a new random context id.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
