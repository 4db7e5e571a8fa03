//! Wire envelope.
//!
//! The envelope is the only value that crosses a transport. It is sent as
//! JSON text on the socket transport and as a structured JSON value on the
//! window-style transports.
//!
//! # Format
//!
//! Request:
//! ```json
//! { "type": "setText", "id": "markwhen_…", "request": true, "params": { "text": "…" } }
//! ```
//!
//! Response:
//! ```json
//! { "type": "setText", "id": "markwhen_…", "response": true }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::MessageId;

use super::MessageType;

// ============================================================================
// EnvelopeKind
// ============================================================================

/// Which side of an exchange an envelope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Expects a reply.
    Request,
    /// Replies to a prior request with the same id.
    Response,
    /// Neither flag set.
    Invalid,
}

// ============================================================================
// Envelope
// ============================================================================

/// A typed message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Tag identifying the payload shape.
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Correlation id, reused verbatim in the response.
    pub id: MessageId,

    /// Set on requests.
    #[serde(default, skip_serializing_if = "is_false")]
    pub request: bool,

    /// Set on responses.
    #[serde(default, skip_serializing_if = "is_false")]
    pub response: bool,

    /// Opaque payload, shape determined by `message_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[inline]
fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Envelope {
    /// Creates a request envelope.
    #[inline]
    #[must_use]
    pub fn request(message_type: MessageType, id: MessageId, params: Option<Value>) -> Self {
        Self {
            message_type,
            id,
            request: true,
            response: false,
            params,
        }
    }

    /// Creates a response envelope.
    #[inline]
    #[must_use]
    pub fn response(message_type: MessageType, id: MessageId, params: Option<Value>) -> Self {
        Self {
            message_type,
            id,
            request: false,
            response: true,
            params,
        }
    }

    /// Classifies the envelope.
    ///
    /// The response flag is checked first, so a faulty peer that sets both
    /// flags is treated as answering.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EnvelopeKind {
        if self.response {
            EnvelopeKind::Response
        } else if self.request {
            EnvelopeKind::Request
        } else {
            EnvelopeKind::Invalid
        }
    }

    /// Decodes the params into `T`.
    ///
    /// Missing params decode as JSON `null`, so `Option<_>` and `()`
    /// targets accept an empty envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if the params do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let params = self.params.clone().unwrap_or(Value::Null);
        serde_json::from_value(params)
            .map_err(|e| Error::invalid_params(self.message_type.clone(), e))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_serialization_omits_response_flag() {
        let envelope = Envelope::request(
            MessageType::SetText,
            MessageId::from_nonce("a"),
            Some(json!({ "text": "now: hello" })),
        );

        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "setText",
                "id": "markwhen_a",
                "request": true,
                "params": { "text": "now: hello" }
            })
        );
    }

    #[test]
    fn test_response_without_params() {
        let envelope = Envelope::response(MessageType::JumpToPath, MessageId::from_nonce("b"), None);

        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(
            value,
            json!({ "type": "jumpToPath", "id": "markwhen_b", "response": true })
        );
    }

    #[test]
    fn test_kind() {
        let id = MessageId::from_nonce("c");
        let mut envelope = Envelope::request(MessageType::AppState, id, None);
        assert_eq!(envelope.kind(), EnvelopeKind::Request);

        envelope.response = true;
        assert_eq!(envelope.kind(), EnvelopeKind::Response);

        envelope.request = false;
        envelope.response = false;
        assert_eq!(envelope.kind(), EnvelopeKind::Invalid);
    }

    #[test]
    fn test_parse_missing_flags_defaults_to_invalid() {
        let envelope: Envelope =
            serde_json::from_value(json!({ "type": "ping", "id": "markwhen_X" })).expect("parse");

        assert_eq!(envelope.kind(), EnvelopeKind::Invalid);
        assert_eq!(envelope.message_type, MessageType::from("ping"));
        assert!(envelope.params.is_none());
    }

    #[test]
    fn test_decode_missing_params_as_none() {
        let envelope: Envelope =
            serde_json::from_value(json!({ "type": "appState", "id": "markwhen_X", "response": true }))
                .expect("parse");

        let decoded: Option<u32> = envelope.decode().expect("decode");
        assert_eq!(decoded, None);
    }

    #[test]
    fn test_decode_mismatch_is_invalid_params() {
        let envelope = Envelope::response(
            MessageType::from("count"),
            MessageId::from_nonce("d"),
            Some(json!("not a number")),
        );

        let err = envelope.decode::<u32>().unwrap_err();
        assert!(matches!(err, Error::InvalidParams { .. }));
    }
}
