//! # Store Interface
//!
//! The persistence seam between the ledger services and a concrete store.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Ledger Operation                               │
//! │                                                                         │
//! │  let mut tx = store.begin().await?;          ← isolation starts        │
//! │       │                                                                 │
//! │       ├── tx.get_item(id)                     ← reads see own writes   │
//! │       ├── tx.update_item(&item)                                        │
//! │       ├── tx.append_history(entry)                                     │
//! │       │                                                                 │
//! │       ├── error? → drop(tx)                   ← everything discarded   │
//! │       ▼                                                                 │
//! │  tx.commit().await?                           ← all or nothing         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  notifier.announce(..)                        ← only after commit      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations must give each transaction serializable isolation with
//! respect to every other transaction on the same store. Reads outside a
//! transaction observe committed state only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;
use toolcrib_core::{HistoryEntry, Item, Loan, LoanStatus, NewHistoryEntry, NewItem, NewLoan};

/// Shared handle to a ledger store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>>;

    /// All items, oldest first.
    async fn list_items(&self) -> DbResult<Vec<Item>>;

    async fn get_item(&self, id: &str) -> DbResult<Option<Item>>;

    async fn count_items(&self) -> DbResult<i64>;

    /// Loans newest first, optionally filtered by status.
    async fn list_loans(&self, status: Option<LoanStatus>) -> DbResult<Vec<Loan>>;

    async fn get_loan(&self, id: &str) -> DbResult<Option<Loan>>;

    /// Most recent history entries, newest first.
    async fn list_history(&self, limit: u32) -> DbResult<Vec<HistoryEntry>>;

    /// `true` when the store answers queries.
    async fn health_check(&self) -> bool;
}

/// One open store transaction.
///
/// Dropping a transaction without calling [`StoreTx::commit`] rolls it back.
#[async_trait]
pub trait StoreTx: Send {
    async fn get_item(&mut self, id: &str) -> DbResult<Option<Item>>;

    /// Inserts an item with `stock == total`; the store assigns id and timestamps.
    async fn insert_item(&mut self, item: &NewItem) -> DbResult<Item>;

    /// Writes every mutable field of `item` and returns it with a fresh
    /// `updated_at`.
    async fn update_item(&mut self, item: &Item) -> DbResult<Item>;

    async fn delete_item(&mut self, id: &str) -> DbResult<()>;

    async fn get_loan(&mut self, id: &str) -> DbResult<Option<Loan>>;

    /// Inserts an active loan with its lines in submission order.
    async fn insert_loan(&mut self, loan: &NewLoan) -> DbResult<Loan>;

    /// Moves an active loan to `Returned`.
    ///
    /// Fails with `NotFound` when no *active* loan has this id.
    async fn mark_returned(&mut self, id: &str, at: DateTime<Utc>) -> DbResult<Loan>;

    async fn append_history(&mut self, entry: &NewHistoryEntry) -> DbResult<HistoryEntry>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
