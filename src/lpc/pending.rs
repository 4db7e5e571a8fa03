//! Pending-request table.
//!
//! Maps each outstanding request id to the completion that resolves its
//! [`ResponseFuture`](super::ResponseFuture). An entry is removed by the
//! first matching response, so it resolves at most once. Dropping the
//! completion is the reject path: the waiting future sees
//! [`Error::ChannelClosed`](crate::Error::ChannelClosed).

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

use crate::identifiers::MessageId;
use crate::protocol::Envelope;

// ============================================================================
// Types
// ============================================================================

/// Completion for one pending request.
pub(crate) type Completion = oneshot::Sender<Envelope>;

// ============================================================================
// PendingTable
// ============================================================================

/// Outstanding requests keyed by correlation id.
#[derive(Default)]
pub(crate) struct PendingTable {
    calls: Mutex<FxHashMap<MessageId, Completion>>,
}

impl PendingTable {
    /// Registers a completion under `id`.
    pub(crate) fn insert(&self, id: MessageId, completion: Completion) {
        self.calls.lock().insert(id, completion);
    }

    /// Resolves and removes the entry matching the response's id.
    ///
    /// Returns `false` if no entry was pending.
    pub(crate) fn resolve(&self, envelope: Envelope) -> bool {
        let completion = self.calls.lock().remove(&envelope.id);

        match completion {
            Some(completion) => {
                // The caller may have stopped waiting; that is not an error.
                let _ = completion.send(envelope);
                true
            }
            None => false,
        }
    }

    /// Removes an entry without resolving it.
    pub(crate) fn remove(&self, id: &MessageId) -> bool {
        self.calls.lock().remove(id).is_some()
    }

    /// Returns `true` if `id` is pending.
    pub(crate) fn contains(&self, id: &MessageId) -> bool {
        self.calls.lock().contains_key(id)
    }

    /// Returns the number of pending entries.
    pub(crate) fn len(&self) -> usize {
        self.calls.lock().len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::MessageType;

    fn response(nonce: &str) -> Envelope {
        Envelope::response(
            MessageType::AppState,
            MessageId::from_nonce(nonce),
            Some(json!({ "isDark": true })),
        )
    }

    #[tokio::test]
    async fn test_resolve_once() {
        let table = PendingTable::default();
        let (tx, rx) = oneshot::channel();
        table.insert(MessageId::from_nonce("a"), tx);

        assert!(table.resolve(response("a")));
        assert!(!table.resolve(response("a")));
        assert_eq!(table.len(), 0);

        let envelope = rx.await.expect("resolved");
        assert_eq!(envelope.params, Some(json!({ "isDark": true })));
    }

    #[test]
    fn test_unknown_response_leaves_table_untouched() {
        let table = PendingTable::default();
        let (tx, _rx) = oneshot::channel();
        table.insert(MessageId::from_nonce("a"), tx);

        assert!(!table.resolve(response("b")));
        assert_eq!(table.len(), 1);
        assert!(table.contains(&MessageId::from_nonce("a")));
    }

    #[test]
    fn test_resolve_after_receiver_dropped() {
        let table = PendingTable::default();
        let (tx, rx) = oneshot::channel();
        table.insert(MessageId::from_nonce("a"), tx);
        drop(rx);

        assert!(table.resolve(response("a")));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_remove_rejects_waiter() {
        let table = PendingTable::default();
        let (tx, rx) = oneshot::channel();
        let id = MessageId::from_nonce("a");
        table.insert(id.clone(), tx);

        assert!(table.remove(&id));
        assert!(!table.remove(&id));
        assert!(rx.await.is_err());
    }
}
