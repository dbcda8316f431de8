//! # toolcrib-ledger: Transactional Services of the Tool Ledger
//!
//! The only writers of items, loans and history.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  apps/server handlers (thin adapters)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 toolcrib-ledger (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │  InventoryLedger ──adjust_stock──◄── LoanEngine                │   │
//! │  │        │                                 │                      │   │
//! │  │        └────────► HistoryRecorder ◄──────┘  (same transaction)  │   │
//! │  │                                                                 │   │
//! │  │  after commit ──► ChangeNotifier::announce(topic)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ Arc<dyn LedgerStore>                                           │
//! │       ▼                                                                 │
//! │  toolcrib-db (SQLite or in-memory)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store transaction is the only concurrency control; no service holds
//! an in-process lock.
//!
//! ## Usage
//! ```rust,ignore
//! let notifier = Arc::new(BroadcastNotifier::new(256));
//! let ledger = Ledger::new(Arc::new(db), notifier.clone());
//!
//! let drill = ledger.inventory().create_item(request).await?;
//! ```

pub mod error;
pub mod history;
pub mod inventory;
pub mod loans;
pub mod notifier;

use std::sync::Arc;

pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use history::HistoryRecorder;
pub use inventory::{CreateItem, EditItem, InventoryLedger};
pub use loans::{CreateLoan, LoanEngine, LoanLineRequest};
pub use notifier::{BroadcastNotifier, ChangeNotifier, RecordingNotifier};

use toolcrib_db::{LedgerStore, StoreTx};

/// The three ledger services over one store and one notifier.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    inventory: InventoryLedger,
    loans: LoanEngine,
    history: HistoryRecorder,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Ledger {
            inventory: InventoryLedger::new(store.clone(), notifier.clone()),
            loans: LoanEngine::new(store.clone(), notifier),
            history: HistoryRecorder::new(store.clone()),
            store,
        }
    }

    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    pub fn loans(&self) -> &LoanEngine {
        &self.loans
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// `true` when the store answers queries.
    pub async fn health_check(&self) -> bool {
        self.store.health_check().await
    }
}

/// Commits `tx`; any failure here means nothing was applied.
pub(crate) async fn commit(tx: Box<dyn StoreTx>) -> LedgerResult<()> {
    tx.commit()
        .await
        .map_err(|e| LedgerError::TransactionAborted(e.to_string()))
}
