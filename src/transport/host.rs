//! Host-embedding transport.
//!
//! Used when the process runs inside a controlling host (an editor
//! extension, a desktop shell) that exposes a message-send function. The
//! host answers by posting to the local [`Window`]. No readiness gating:
//! the capability is usable as soon as it exists.

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
// HostTransport
// ============================================================================

/// Transport over a host-provided message API.
pub struct HostTransport {
    channel: PostChannel,
}

impl HostTransport {
    /// Creates a transport posting to `host` and listening on `window`.
    #[must_use]
    pub fn new(host: Arc<dyn MessageSink>, window: &Window, events: EventSender) -> Self {
        debug!(window = %window.id(), "Using host transport");
        Self {
            channel: PostChannel::new(host, window, events),
        }
    }
}

impl TransportProvider for HostTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Host
    }

    fn is_ready(&self) -> bool {
        self.channel.is_open()
    }

    fn post(&self, envelope: &Envelope) -> Result<()> {
        self.channel.post(envelope)
    }

    fn close(&self) {
        if self.channel.close() {
            debug!("Host transport listener removed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::identifiers::MessageId;
    use crate::protocol::MessageType;
    use crate::transport::window::tests::channel_sink;

    #[tokio::test]
    async fn test_host_posts_structured_envelope() {
        let window = Window::new();
        let (host, mut posted) = channel_sink();
        let (events, _rx) = mpsc::unbounded_channel();
        let transport = HostTransport::new(host, &window, events);

        assert_eq!(transport.kind(), TransportKind::Host);
        assert!(transport.is_ready());

        let envelope = Envelope::request(
            MessageType::ShowInEditor,
            MessageId::from_nonce("h"),
            Some(json!([0, 1])),
        );
        transport.post(&envelope).expect("post");

        let message = posted.recv().await.expect("posted");
        assert_eq!(
            message.data,
            json!({ "type": "showInEditor", "id": "markwhen_h", "request": true, "params": [0, 1] })
        );
    }

    #[tokio::test]
    async fn test_close_twice() {
        let window = Window::new();
        let (host, _posted) = channel_sink();
        let (events, _rx) = mpsc::unbounded_channel();
        let transport = HostTransport::new(host, &window, events);

        transport.close();
        transport.close();
        assert!(!transport.is_ready());
    }
}
