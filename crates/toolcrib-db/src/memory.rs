//! # In-Memory Store
//!
//! A [`LedgerStore`] that keeps its tables in process memory.
//!
//! ## Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    MemoryStore Transactions                             │
//! │                                                                         │
//! │  Arc<Mutex<Tables>>  (committed state)                                 │
//! │       │                                                                 │
//! │       │ begin(): lock_owned()  ← held until commit/rollback/drop       │
//! │       ▼                                                                 │
//! │  MemoryTx { guard, working: guard.clone() }                            │
//! │       │                                                                 │
//! │       ├── reads/writes hit `working` only                              │
//! │       │                                                                 │
//! │       ├── commit()   → *guard = working, unlock                        │
//! │       └── drop       → working discarded, unlock                       │
//! │                                                                         │
//! │  One transaction at a time: serializable by construction.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads outside a transaction wait for any open transaction to finish and
//! then see committed state only. Used by the ledger tests and handy for
//! demos without a database file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::{LedgerStore, StoreTx};
use toolcrib_core::{HistoryEntry, Item, Loan, LoanStatus, NewHistoryEntry, NewItem, NewLoan};

#[derive(Debug, Clone, Default)]
struct Tables {
    /// Insertion order is creation order.
    items: Vec<Item>,
    loans: Vec<Loan>,
    history: Vec<HistoryEntry>,
}

/// Ledger store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `commit` fail with `TransactionConflict`, as if a
    /// concurrent writer had won. The transaction's writes are discarded.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = Tables::clone(&guard);
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_commit: self.fail_next_commit.clone(),
        }))
    }

    async fn list_items(&self) -> DbResult<Vec<Item>> {
        Ok(self.tables.lock().await.items.clone())
    }

    async fn get_item(&self, id: &str) -> DbResult<Option<Item>> {
        Ok(self.tables.lock().await.find_item(id).cloned())
    }

    async fn count_items(&self) -> DbResult<i64> {
        Ok(self.tables.lock().await.items.len() as i64)
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> DbResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .iter()
            .rev()
            .filter(|loan| status.map_or(true, |s| loan.status == s))
            .cloned()
            .collect())
    }

    async fn get_loan(&self, id: &str) -> DbResult<Option<Loan>> {
        Ok(self.tables.lock().await.find_loan(id).cloned())
    }

    async fn list_history(&self, limit: u32) -> DbResult<Vec<HistoryEntry>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .history
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

impl Tables {
    fn find_item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    fn find_loan(&self, id: &str) -> Option<&Loan> {
        self.loans.iter().find(|loan| loan.id == id)
    }
}

/// An open in-memory transaction. Holds the store's lock.
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_item(&mut self, id: &str) -> DbResult<Option<Item>> {
        Ok(self.working.find_item(id).cloned())
    }

    async fn insert_item(&mut self, new: &NewItem) -> DbResult<Item> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name: new.name.clone(),
            brand: new.brand.clone(),
            sku: new.sku.clone(),
            kind: new.kind.clone(),
            stock: new.total,
            total: new.total,
            created_at: now,
            updated_at: now,
        };
        self.working.items.push(item.clone());
        Ok(item)
    }

    async fn update_item(&mut self, item: &Item) -> DbResult<Item> {
        if item.stock < 0 || item.stock > item.total {
            return Err(DbError::ConstraintViolation(format!(
                "stock {} outside 0..={}",
                item.stock, item.total
            )));
        }

        let slot = self
            .working
            .items
            .iter_mut()
            .find(|existing| existing.id == item.id)
            .ok_or_else(|| DbError::not_found("Item", &item.id))?;

        *slot = Item {
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_item(&mut self, id: &str) -> DbResult<()> {
        let before = self.working.items.len();
        self.working.items.retain(|item| item.id != id);
        if self.working.items.len() == before {
            return Err(DbError::not_found("Item", id));
        }
        Ok(())
    }

    async fn get_loan(&mut self, id: &str) -> DbResult<Option<Loan>> {
        Ok(self.working.find_loan(id).cloned())
    }

    async fn insert_loan(&mut self, new: &NewLoan) -> DbResult<Loan> {
        let loan = Loan {
            id: Uuid::new_v4().to_string(),
            responsible: new.responsible.clone(),
            location: new.location.clone(),
            date: new.date,
            lines: new.lines.clone(),
            signature: new.signature.clone(),
            status: LoanStatus::Active,
            return_date: None,
            created_at: Utc::now(),
        };
        self.working.loans.push(loan.clone());
        Ok(loan)
    }

    async fn mark_returned(&mut self, id: &str, at: DateTime<Utc>) -> DbResult<Loan> {
        let loan = self
            .working
            .loans
            .iter_mut()
            .find(|loan| loan.id == id && loan.status == LoanStatus::Active)
            .ok_or_else(|| DbError::not_found("Loan (active)", id))?;

        loan.status = LoanStatus::Returned;
        loan.return_date = Some(at);
        Ok(loan.clone())
    }

    async fn append_history(&mut self, new: &NewHistoryEntry) -> DbResult<HistoryEntry> {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            action: new.action,
            description: new.description.clone(),
            created_at: Utc::now(),
        };
        self.working.history.push(entry.clone());
        Ok(entry)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryTx {
            mut guard,
            working,
            fail_commit,
        } = *self;

        if fail_commit.swap(false, Ordering::SeqCst) {
            debug!("Injected commit failure");
            return Err(DbError::TransactionConflict(
                "injected commit failure".to_string(),
            ));
        }

        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use toolcrib_core::HistoryAction;

    fn new_item(total: i64) -> NewItem {
        NewItem {
            name: "Level".to_string(),
            brand: String::new(),
            sku: "LE1000".to_string(),
            kind: String::new(),
            total,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_working_copy() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let item = tx.insert_item(&new_item(3)).await.unwrap();
        // Writes are visible inside the transaction
        assert!(tx.get_item(&item.id).await.unwrap().is_some());
        tx.commit().await.unwrap();

        assert_eq!(store.count_items().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_drop_discards_working_copy() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_item(&new_item(3)).await.unwrap();
        drop(tx);

        assert_eq!(store.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure_discards_writes_once() {
        let store = MemoryStore::new();
        store.fail_next_commit();

        let mut tx = store.begin().await.unwrap();
        tx.insert_item(&new_item(3)).await.unwrap();
        tx.append_history(&NewHistoryEntry::new(HistoryAction::Created, "Level"))
            .await
            .unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.count_items().await.unwrap(), 0);
        assert!(store.list_history(10).await.unwrap().is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.insert_item(&new_item(3)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.count_items().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let store = MemoryStore::new();
        let tx = store.begin().await.unwrap();

        let other = store.clone();
        let waiter = tokio::spawn(async move { other.begin().await.map(|_| ()) });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(tx);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_broken_invariant() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let item = tx.insert_item(&new_item(2)).await.unwrap();

        let err = tx
            .update_item(&Item {
                stock: 3,
                ..item
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_mark_returned_only_from_active() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let loan = tx
            .insert_loan(&NewLoan {
                responsible: "Luis".to_string(),
                location: String::new(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                lines: Vec::new(),
                signature: None,
            })
            .await
            .unwrap();

        tx.mark_returned(&loan.id, Utc::now()).await.unwrap();
        assert!(matches!(
            tx.mark_returned(&loan.id, Utc::now()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
