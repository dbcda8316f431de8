//! Shared application state.

use std::sync::Arc;

use toolcrib_db::LedgerStore;
use toolcrib_ledger::{BroadcastNotifier, Ledger};

/// Handed to every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    /// Same channel the ledger announces on; `/ws` subscribes here.
    pub notifier: BroadcastNotifier,
    /// Default page size for `GET /api/history`.
    pub history_limit: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: BroadcastNotifier, history_limit: u32) -> Self {
        AppState {
            ledger: Ledger::new(store, Arc::new(notifier.clone())),
            notifier,
            history_limit,
        }
    }
}
