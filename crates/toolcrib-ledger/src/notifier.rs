//! # Change Notifier
//!
//! Post-commit fan-out of "something changed" topics.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  tx.commit() ── Ok ──► notifier.announce(InventoryChanged)              │
//! │                        notifier.announce(LoansChanged)                  │
//! │                        notifier.announce(HistoryChanged)                │
//! │                               │                                         │
//! │                               ▼                                         │
//! │               broadcast::Sender<Topic> (bounded ring)                   │
//! │                 │            │            │                             │
//! │                 ▼            ▼            ▼                             │
//! │              /ws #1       /ws #2       /ws #3   → client re-fetches     │
//! │                                                                         │
//! │  tx.commit() ── Err ──► nothing announced                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Topics carry no payload. A subscriber that falls more than the channel
//! capacity behind skips the missed topics; there is no replay.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use toolcrib_core::Topic;

/// Receives topics after a transaction commits.
///
/// Fire-and-forget: implementations must not block and cannot fail.
pub trait ChangeNotifier: Send + Sync {
    fn announce(&self, topic: Topic);
}

/// Announces each topic once, in order.
pub(crate) fn announce_all(notifier: &dyn ChangeNotifier, topics: &[Topic]) {
    for topic in topics {
        notifier.announce(*topic);
    }
}

// =============================================================================
// Broadcast Notifier
// =============================================================================

/// Fans topics out to every current subscriber over a tokio broadcast
/// channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Topic>,
}

impl BroadcastNotifier {
    /// Creates a notifier whose subscribers may lag at most `capacity` topics.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        BroadcastNotifier { tx }
    }

    /// Subscribes to topics announced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Topic> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn announce(&self, topic: Topic) {
        // Err only means nobody is listening
        let delivered = self.tx.send(topic).unwrap_or(0);
        debug!(%topic, delivered, "Announced change");
    }
}

// =============================================================================
// Recording Notifier
// =============================================================================

/// Keeps every announced topic in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    topics: Mutex<Vec<Topic>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topics announced so far, in order.
    pub fn topics(&self) -> Vec<Topic> {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn announce(&self, topic: Topic) {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(topic);
    }
}
