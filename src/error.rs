//! Error types for the Markwhen LPC layer.
//!
//! Nothing on the core send path fails synchronously: malformed traffic is
//! ignored or logged, and an unanswered request simply never completes.
//! The variants below surface from configuration, the typed helpers, and
//! the opt-in timeout.
//!
//! # Usage
//!
//! ```ignore
//! use markwhen_lpc::{kind, Lpc, Result};
//!
//! async fn example(lpc: &Lpc) -> Result<()> {
//!     let state = lpc.request::<kind::AppState>(None).await?;
//!     println!("{state:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Url`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::NoTransport`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidParams`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::MessageId;
use crate::protocol::MessageType;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`LpcBuilder::connect`](crate::LpcBuilder::connect) when
    /// the supplied configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Relay address could not be parsed.
    #[error("Invalid relay URL: {0}")]
    Url(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport failed to deliver a message.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No transport was selected at construction.
    #[error("Nothing to post to: no transport available")]
    NoTransport,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected envelope.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Inbound params did not match the registered handler's payload type.
    #[error("Invalid params for {message_type}: {source}")]
    InvalidParams {
        /// Message type the params were addressed to.
        message_type: MessageType,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Request timed out waiting for its response.
    ///
    /// Only produced by
    /// [`Lpc::request_with_timeout`](crate::Lpc::request_with_timeout).
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: MessageId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Pending completion was dropped before a response arrived.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid params error.
    #[inline]
    pub fn invalid_params(message_type: MessageType, source: serde_json::Error) -> Self {
        Self::InvalidParams {
            message_type,
            source,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: MessageId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NoTransport
                | Self::ChannelClosed(_)
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("socket reset");
        assert_eq!(err.to_string(), "Connection failed: socket reset");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("relay URL must use ws or wss");
        assert_eq!(
            err.to_string(),
            "Configuration error: relay URL must use ws or wss"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::request_timeout(MessageId::from_nonce("abc"), 500);
        let other_err = Error::protocol("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
        assert_eq!(
            timeout_err.to_string(),
            "Request markwhen_abc timed out after 500ms"
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::NoTransport.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_invalid_params_names_type() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = Error::invalid_params(MessageType::SetText, source);
        assert!(err.to_string().starts_with("Invalid params for setText"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
