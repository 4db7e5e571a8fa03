//! Window-style message channels.
//!
//! A [`Window`] is the local context's message target: anything posted to
//! it is broadcast to every listener, including listeners owned by the
//! poster. Messages carry the poster's [`ContextId`] so a context can
//! recognise its own broadcasts.
//!
//! The host and parent transports post outbound envelopes to a
//! [`MessageSink`] and receive inbound traffic through a listener on the
//! local window, held by a [`ListenerGuard`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::ContextId;
use crate::protocol::Envelope;

use super::{EventSender, RawMessage, TransportEvent};

// ============================================================================
// MessageSink
// ============================================================================

/// Something that accepts posted messages.
///
/// Implemented by [`Window`]; embedders implement it for the host API or
/// the enclosing context they are running under.
pub trait MessageSink: Send + Sync {
    /// Posts a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed over.
    fn post_message(&self, message: RawMessage) -> Result<()>;
}

// ============================================================================
// Window
// ============================================================================

/// The local execution context's message target.
///
/// Every listener has its own unbounded queue; posts are never dropped
/// while a listener is alive.
pub struct Window {
    /// Identity of this context.
    id: ContextId,
    /// One queue per listener; closed queues are pruned lazily.
    listeners: Mutex<Vec<mpsc::UnboundedSender<RawMessage>>>,
}

impl Window {
    /// Creates a window with a fresh [`ContextId`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(ContextId::new())
    }

    /// Creates a window with the given id.
    #[must_use]
    pub fn with_id(id: ContextId) -> Self {
        Self {
            id,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Returns this context's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// Subscribes to messages posted to this window.
    ///
    /// The subscription ends when the receiver is dropped.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RawMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(tx);
        rx
    }

    /// Returns the number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl MessageSink for Window {
    fn post_message(&self, message: RawMessage) -> Result<()> {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| tx.send(message.clone()).is_ok());

        // No listeners: the message is dropped, as an unobserved event would be.
        if listeners.is_empty() {
            trace!(window = %self.id, "Message posted to window without listeners");
        }
        Ok(())
    }
}

// ============================================================================
// ListenerGuard
// ============================================================================

/// Forwards a window's messages to a transport event channel.
///
/// The listener is registered on construction and released exactly once,
/// by [`release`](Self::release) or on drop.
pub(crate) struct ListenerGuard {
    /// Forwarding task; `None` once released.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ListenerGuard {
    /// Subscribes to `window` and starts forwarding to `events`.
    pub(crate) fn spawn(window: &Window, events: EventSender) -> Self {
        let mut receiver = window.subscribe();
        let window_id = window.id();

        let task = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                if events.send(TransportEvent::Message(message)).is_err() {
                    break;
                }
            }
            debug!(window = %window_id, "Window listener stopped");
        });

        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Stops forwarding. Returns `false` if already released.
    pub(crate) fn release(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Returns `true` until released.
    pub(crate) fn is_active(&self) -> bool {
        self.task.lock().is_some()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// PostChannel
// ============================================================================

/// Shared plumbing of the host and parent transports.
pub(crate) struct PostChannel {
    /// Where outbound envelopes are posted.
    target: Arc<dyn MessageSink>,
    /// Origin stamped on outbound messages.
    local: ContextId,
    /// Inbound listener on the local window.
    listener: ListenerGuard,
}

impl PostChannel {
    /// Creates a channel posting to `target` and listening on `window`.
    pub(crate) fn new(target: Arc<dyn MessageSink>, window: &Window, events: EventSender) -> Self {
        Self {
            target,
            local: window.id(),
            listener: ListenerGuard::spawn(window, events),
        }
    }

    /// Posts an envelope as structured JSON.
    pub(crate) fn post(&self, envelope: &Envelope) -> Result<()> {
        let data = serde_json::to_value(envelope)?;
        self.target
            .post_message(RawMessage::new(data, Some(self.local)))
    }

    /// Releases the listener. Returns `false` if already closed.
    pub(crate) fn close(&self) -> bool {
        self.listener.release()
    }

    /// Returns `true` until closed.
    pub(crate) fn is_open(&self) -> bool {
        self.listener.is_active()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Sink that forwards every posted message to a channel.
    pub(crate) struct ChannelSink(pub(crate) mpsc::UnboundedSender<RawMessage>);

    impl MessageSink for ChannelSink {
        fn post_message(&self, message: RawMessage) -> Result<()> {
            let _ = self.0.send(message);
            Ok(())
        }
    }

    /// Returns a sink and the receiver observing it.
    pub(crate) fn channel_sink() -> (Arc<ChannelSink>, mpsc::UnboundedReceiver<RawMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelSink(tx)), rx)
    }

    #[test]
    fn test_window_ids_are_unique() {
        assert_ne!(Window::new().id(), Window::new().id());
    }

    #[test]
    fn test_post_without_listeners_is_ok() {
        let window = Window::new();
        let result = window.post_message(RawMessage::new(json!({}), None));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_listener_forwards_messages() {
        let window = Window::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = ListenerGuard::spawn(&window, tx);

        let message = RawMessage::new(json!({ "id": "markwhen_a" }), None);
        window.post_message(message.clone()).expect("post");

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event in time");
        assert_eq!(event, Some(TransportEvent::Message(message)));
    }

    #[tokio::test]
    async fn test_listener_keeps_every_message_of_a_burst() {
        const BURST: usize = 2_000;

        let window = Window::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = ListenerGuard::spawn(&window, tx);

        // Posted before the forwarding task gets a chance to run.
        for i in 0..BURST {
            window
                .post_message(RawMessage::new(json!({ "id": format!("markwhen_{i}") }), None))
                .expect("post");
        }

        for i in 0..BURST {
            let event = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event in time")
                .expect("event");
            let TransportEvent::Message(message) = event else {
                panic!("expected message");
            };
            assert_eq!(message.data["id"], format!("markwhen_{i}"));
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let window = Window::new();
        let kept = window.subscribe();
        let dropped = window.subscribe();
        assert_eq!(window.listener_count(), 2);

        drop(dropped);
        window
            .post_message(RawMessage::new(json!({}), None))
            .expect("post");
        assert_eq!(window.listener_count(), 1);
        drop(kept);
        assert_eq!(window.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_release_is_single_and_stops_forwarding() {
        let window = Window::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = ListenerGuard::spawn(&window, tx);

        assert!(guard.is_active());
        assert!(guard.release());
        assert!(!guard.release());
        assert!(!guard.is_active());

        // The aborted task owned the only sender.
        let next = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("channel closes");
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn test_post_channel_stamps_local_origin() {
        let window = Window::new();
        let (sink, mut posted) = channel_sink();
        let (tx, _rx) = mpsc::unbounded_channel();
        let channel = PostChannel::new(sink, &window, tx);

        let envelope = Envelope::request(
            crate::protocol::MessageType::AppState,
            crate::identifiers::MessageId::from_nonce("x"),
            None,
        );
        channel.post(&envelope).expect("post");

        let message = posted.recv().await.expect("posted");
        assert_eq!(message.source, Some(window.id()));
        assert_eq!(message.data["id"], "markwhen_x");
        assert_eq!(message.data["request"], true);

        assert!(channel.close());
        assert!(!channel.close());
        assert!(!channel.is_open());
    }
}
