//! Parent-context transport.
//!
//! Used when embedded in an enclosing context (an iframe-like parent) with
//! no host API. Messages are posted to the parent and answers arrive on
//! the local [`Window`].
//!
//! A top-level context may be its own parent. Its requests then come back
//! to it with its own id as source and are discarded by the router.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::protocol::Envelope;

use super::window::PostChannel;
use super::{EventSender, MessageSink, TransportKind, TransportProvider, Window};

// ============================================================================
// ParentTransport
// ============================================================================

/// Transport over the enclosing context's message API.
pub struct ParentTransport {
    channel: PostChannel,
}

impl ParentTransport {
    /// Creates a transport posting to `parent` and listening on `window`.
    #[must_use]
    pub fn new(parent: Arc<dyn MessageSink>, window: &Window, events: EventSender) -> Self {
        debug!(window = %window.id(), "Using parent transport");
        Self {
            channel: PostChannel::new(parent, window, events),
        }
    }
}

impl TransportProvider for ParentTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Parent
    }

    fn is_ready(&self) -> bool {
        self.channel.is_open()
    }

    fn post(&self, envelope: &Envelope) -> Result<()> {
        self.channel.post(envelope)
    }

    fn close(&self) {
        if self.channel.close() {
            debug!("Parent transport listener removed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::identifiers::MessageId;
    use crate::protocol::MessageType;
    use crate::transport::TransportEvent;

    #[tokio::test]
    async fn test_self_parent_echoes_with_own_origin() {
        let window = Arc::new(Window::new());
        let (events, mut rx) = mpsc::unbounded_channel();
        let transport = ParentTransport::new(window.clone(), &window, events);

        let envelope = Envelope::request(MessageType::AppState, MessageId::from_nonce("p"), None);
        transport.post(&envelope).expect("post");

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event in time")
            .expect("event");
        let TransportEvent::Message(message) = event else {
            panic!("expected message event");
        };
        assert_eq!(message.source, Some(window.id()));
        assert_eq!(message.data["id"], "markwhen_p");

        assert_eq!(transport.kind(), TransportKind::Parent);
        transport.close();
        transport.close();
    }
}
