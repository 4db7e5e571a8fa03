//! Inbound router.
//!
//! Runs once per raw message on the active transport. Filtering happens in
//! a fixed order:
//!
//! 1. No `id`, or an `id` without the protocol prefix: foreign traffic.
//! 2. Declared origin equal to this context: our own broadcast echoed back.
//! 3. Does not decode as an envelope: malformed.
//!
//! What remains is a response (resolves the pending entry), a request
//! (dispatched to the registered handler), or neither (reported).

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::error::Error;
use crate::identifiers::{ContextId, MessageId};
use crate::protocol::{Envelope, EnvelopeKind, MessageType};
use crate::transport::{EventReceiver, RawMessage, TransportEvent};

use super::core::LpcInner;

// ============================================================================
// Constants
// ============================================================================

/// Requests issued as soon as the relay connection opens.
const BOOTSTRAP_REQUESTS: [MessageType; 2] = [MessageType::AppState, MessageType::MarkwhenState];

// ============================================================================
// Route
// ============================================================================

/// Classification of one raw message.
#[derive(Debug)]
pub(crate) enum Route {
    /// Not this protocol.
    Foreign,
    /// Sent by this context.
    Echo,
    /// Protocol id but not a valid envelope.
    Malformed(serde_json::Error),
    /// Answers one of our requests.
    Response(Envelope),
    /// Asks us to run a handler.
    Request(Envelope),
    /// Neither request nor response.
    Unclassified(Envelope),
}

/// Classifies a raw message for the context `local`.
pub(crate) fn classify(message: RawMessage, local: ContextId) -> Route {
    let is_ours = message
        .data
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(MessageId::is_protocol_id);

    if !is_ours {
        return Route::Foreign;
    }

    if message.source == Some(local) {
        return Route::Echo;
    }

    match serde_json::from_value::<Envelope>(message.data) {
        Ok(envelope) => match envelope.kind() {
            EnvelopeKind::Response => Route::Response(envelope),
            EnvelopeKind::Request => Route::Request(envelope),
            EnvelopeKind::Invalid => Route::Unclassified(envelope),
        },
        Err(e) => Route::Malformed(e),
    }
}

// ============================================================================
// Routing
// ============================================================================

/// Routes one raw message.
pub(crate) fn route(inner: &Arc<LpcInner>, message: RawMessage) {
    match classify(message, inner.context_id()) {
        Route::Foreign => trace!("Foreign message ignored"),

        Route::Echo => trace!("Own message ignored"),

        Route::Malformed(e) => warn!(error = %e, "Malformed envelope ignored"),

        Route::Response(envelope) => {
            let id = envelope.id.clone();
            if inner.pending.resolve(envelope) {
                trace!(%id, "Response matched");
            } else {
                trace!(%id, "Response for unknown request");
            }
        }

        Route::Request(envelope) => dispatch_request(inner, envelope),

        Route::Unclassified(envelope) => {
            let e = Error::protocol("envelope is neither a request nor a response");
            error!(
                id = %envelope.id,
                message_type = %envelope.message_type,
                error = %e,
                "Envelope discarded"
            );
        }
    }
}

/// Invokes the handler for a request and replies with its result.
///
/// The handler's synchronous part runs here; the rest is awaited on its
/// own task so the router keeps draining inbound traffic.
fn dispatch_request(inner: &Arc<LpcInner>, envelope: Envelope) {
    let Envelope {
        message_type,
        id,
        params,
        ..
    } = envelope;

    let Some(handler) = inner.handlers.get(&message_type) else {
        debug!(%id, %message_type, "No handler registered, request dropped");
        return;
    };

    let pending = handler(params);
    let inner = Arc::clone(inner);

    tokio::spawn(async move {
        match pending.await {
            Ok(result) => inner.send_response(id, message_type, result),
            Err(e) => warn!(%id, %message_type, error = %e, "Handler failed, no response sent"),
        }
    });
}

/// Requests the peer's state after the relay connection opens.
///
/// The answers only settle their pending entries; state reaches the
/// handlers when the peer pushes it as a request.
fn bootstrap(inner: &Arc<LpcInner>) {
    for message_type in BOOTSTRAP_REQUESTS {
        let response = inner.send_request(message_type, None);
        trace!(id = %response.id(), "Bootstrap request sent");
    }
}

// ============================================================================
// Router Task
// ============================================================================

/// Drains transport events until the transport or the instance goes away.
pub(crate) async fn run(inner: Weak<LpcInner>, mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        match event {
            TransportEvent::Opened => {
                debug!("Transport opened, requesting state");
                bootstrap(&inner);
            }
            TransportEvent::Message(message) => route(&inner, message),
            TransportEvent::Closed => debug!("Transport closed"),
        }
    }

    debug!("Router stopped");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn raw(data: Value, source: Option<ContextId>) -> RawMessage {
        RawMessage::new(data, source)
    }

    #[test]
    fn test_missing_or_foreign_id_is_foreign() {
        let local = ContextId::new();

        let no_id = raw(json!({ "type": "ping", "request": true }), None);
        assert!(matches!(classify(no_id, local), Route::Foreign));

        let foreign = raw(json!({ "type": "ping", "request": true, "id": "vscode_1" }), None);
        assert!(matches!(classify(foreign, local), Route::Foreign));

        let numeric = raw(json!({ "type": "ping", "request": true, "id": 7 }), None);
        assert!(matches!(classify(numeric, local), Route::Foreign));

        let not_object = raw(json!("markwhen_X"), None);
        assert!(matches!(classify(not_object, local), Route::Foreign));
    }

    #[test]
    fn test_own_origin_is_echo() {
        let local = ContextId::new();
        let message = raw(
            json!({ "type": "ping", "request": true, "id": "markwhen_X" }),
            Some(local),
        );
        assert!(matches!(classify(message, local), Route::Echo));
    }

    #[test]
    fn test_peer_origin_is_routed() {
        let local = ContextId::new();
        let message = raw(
            json!({ "type": "ping", "request": true, "id": "markwhen_X" }),
            Some(ContextId::new()),
        );
        let Route::Request(envelope) = classify(message, local) else {
            panic!("expected request");
        };
        assert_eq!(envelope.message_type, MessageType::from("ping"));
    }

    #[test]
    fn test_response_flag_classifies_as_response() {
        let message = raw(
            json!({ "type": "appState", "response": true, "id": "markwhen_X", "params": null }),
            None,
        );
        assert!(matches!(
            classify(message, ContextId::new()),
            Route::Response(_)
        ));
    }

    #[test]
    fn test_no_flags_is_unclassified() {
        let message = raw(json!({ "type": "ping", "id": "markwhen_X" }), None);
        assert!(matches!(
            classify(message, ContextId::new()),
            Route::Unclassified(_)
        ));
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let message = raw(json!({ "id": "markwhen_X", "request": true }), None);
        assert!(matches!(
            classify(message, ContextId::new()),
            Route::Malformed(_)
        ));
    }
}
