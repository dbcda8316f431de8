//! SQLite implementation of the store traits.
//!
//! Committed reads go through a pooled connection. A [`SqliteTx`] owns one
//! connection for its whole lifetime and is opened by
//! [`Database::begin_write`]; with the default `BeginMode::Immediate` it
//! holds SQLite's write lock from `BEGIN` to `COMMIT`. Concurrent transactions therefore run one after another,
//! whichever items they touch; a transaction that cannot get the lock within
//! the busy timeout fails with `DbError::TransactionConflict` before doing
//! anything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{HistoryRepository, ItemRepository, LoanRepository};
use crate::store::{LedgerStore, StoreTx};
use toolcrib_core::{HistoryEntry, Item, Loan, LoanStatus, NewHistoryEntry, NewItem, NewLoan};

#[async_trait]
impl LedgerStore for Database {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        let tx = self.begin_write().await.map_err(|e| {
            if e.is_conflict() {
                warn!(error = %e, "Gave up waiting for the write lock");
            }
            e
        })?;
        debug!("Transaction opened");
        Ok(Box::new(SqliteTx { tx }))
    }

    async fn list_items(&self) -> DbResult<Vec<Item>> {
        let mut conn = self.pool().acquire().await?;
        ItemRepository::new(&mut conn).list().await
    }

    async fn get_item(&self, id: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool().acquire().await?;
        ItemRepository::new(&mut conn).get(id).await
    }

    async fn count_items(&self) -> DbResult<i64> {
        let mut conn = self.pool().acquire().await?;
        ItemRepository::new(&mut conn).count().await
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> DbResult<Vec<Loan>> {
        let mut conn = self.pool().acquire().await?;
        LoanRepository::new(&mut conn).list(status).await
    }

    async fn get_loan(&self, id: &str) -> DbResult<Option<Loan>> {
        let mut conn = self.pool().acquire().await?;
        LoanRepository::new(&mut conn).get(id).await
    }

    async fn list_history(&self, limit: u32) -> DbResult<Vec<HistoryEntry>> {
        let mut conn = self.pool().acquire().await?;
        HistoryRepository::new(&mut conn).list_recent(limit).await
    }

    async fn health_check(&self) -> bool {
        self.ping().await
    }
}

/// An open SQLite transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn get_item(&mut self, id: &str) -> DbResult<Option<Item>> {
        ItemRepository::new(&mut self.tx).get(id).await
    }

    async fn insert_item(&mut self, item: &NewItem) -> DbResult<Item> {
        ItemRepository::new(&mut self.tx).insert(item).await
    }

    async fn update_item(&mut self, item: &Item) -> DbResult<Item> {
        ItemRepository::new(&mut self.tx).update(item).await
    }

    async fn delete_item(&mut self, id: &str) -> DbResult<()> {
        ItemRepository::new(&mut self.tx).delete(id).await
    }

    async fn get_loan(&mut self, id: &str) -> DbResult<Option<Loan>> {
        LoanRepository::new(&mut self.tx).get(id).await
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> DbResult<Loan> {
        LoanRepository::new(&mut self.tx).insert(loan).await
    }

    async fn mark_returned(&mut self, id: &str, at: DateTime<Utc>) -> DbResult<Loan> {
        LoanRepository::new(&mut self.tx).mark_returned(id, at).await
    }

    async fn append_history(&mut self, entry: &NewHistoryEntry) -> DbResult<HistoryEntry> {
        HistoryRepository::new(&mut self.tx).append(entry).await
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await.map_err(|e| match DbError::from(e) {
            DbError::TransactionConflict(msg) => {
                warn!(error = %msg, "Commit could not get the write lock");
                DbError::TransactionConflict(msg)
            }
            other => DbError::TransactionFailed(other.to_string()),
        })?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::NaiveDate;
    use toolcrib_core::{CartLine, HistoryAction};

    async fn store() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_item(name: &str, total: i64) -> NewItem {
        NewItem {
            name: name.to_string(),
            brand: "Stanley".to_string(),
            sku: "HA1234".to_string(),
            kind: "Hand tool".to_string(),
            total,
        }
    }

    fn new_loan(item_id: &str) -> NewLoan {
        NewLoan {
            responsible: "Ana".to_string(),
            location: "Taller 2".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            lines: vec![
                CartLine {
                    item_id: item_id.to_string(),
                    quantity: 2,
                    name_snapshot: "Hammer".to_string(),
                },
                CartLine {
                    item_id: item_id.to_string(),
                    quantity: 1,
                    name_snapshot: "Hammer".to_string(),
                },
            ],
            signature: Some("data:image/png;base64,AAAA".to_string()),
        }
    }

    #[tokio::test]
    async fn test_item_crud_round_trip() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        let item = tx.insert_item(&new_item("Hammer", 5)).await.unwrap();
        assert_eq!((item.stock, item.total), (5, 5));
        tx.commit().await.unwrap();

        let fetched = db.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Hammer");
        assert_eq!(fetched.kind, "Hand tool");
        assert_eq!(db.count_items().await.unwrap(), 1);

        let mut tx = db.begin().await.unwrap();
        let updated = tx
            .update_item(&Item {
                stock: 3,
                ..fetched.clone()
            })
            .await
            .unwrap();
        assert_eq!(updated.stock, 3);
        tx.commit().await.unwrap();
        assert_eq!(db.get_item(&item.id).await.unwrap().unwrap().stock, 3);

        let mut tx = db.begin().await.unwrap();
        tx.delete_item(&item.id).await.unwrap();
        tx.commit().await.unwrap();
        assert!(db.get_item(&item.id).await.unwrap().is_none());
        assert!(db.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = store().await;

        {
            let mut tx = db.begin().await.unwrap();
            tx.insert_item(&new_item("Saw", 2)).await.unwrap();
            tx.append_history(&NewHistoryEntry::new(HistoryAction::Created, "Saw"))
                .await
                .unwrap();
        }

        assert_eq!(db.count_items().await.unwrap(), 0);
        assert!(db.list_history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_rollback() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        tx.insert_item(&new_item("Saw", 2)).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(db.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_constraint_backstop() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        let item = tx.insert_item(&new_item("Drill", 2)).await.unwrap();
        let err = tx
            .update_item(&Item {
                stock: -1,
                ..item
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_loan_lines_keep_order_and_are_not_merged() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        let item = tx.insert_item(&new_item("Hammer", 5)).await.unwrap();
        let loan = tx.insert_loan(&new_loan(&item.id)).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = db.get_loan(&loan.id).await.unwrap().unwrap();
        assert_eq!(fetched.lines.len(), 2);
        assert_eq!(fetched.lines[0].quantity, 2);
        assert_eq!(fetched.lines[1].quantity, 1);
        assert_eq!(fetched.status, LoanStatus::Active);
        assert_eq!(fetched.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(fetched.signature.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[tokio::test]
    async fn test_mark_returned_runs_once() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        let item = tx.insert_item(&new_item("Hammer", 5)).await.unwrap();
        let loan = tx.insert_loan(&new_loan(&item.id)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let returned = tx.mark_returned(&loan.id, Utc::now()).await.unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert!(returned.return_date.is_some());
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = tx.mark_returned(&loan.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_loans_newest_first_with_filter() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        let item = tx.insert_item(&new_item("Hammer", 50)).await.unwrap();
        let first = tx.insert_loan(&new_loan(&item.id)).await.unwrap();
        let second = tx.insert_loan(&new_loan(&item.id)).await.unwrap();
        tx.mark_returned(&first.id, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let all = db.list_loans(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
        assert!(all.iter().all(|l| l.lines.len() == 2));

        let active = db.list_loans(Some(LoanStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let returned = db.list_loans(Some(LoanStatus::Returned)).await.unwrap();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].id, first.id);
    }

    #[tokio::test]
    async fn test_history_newest_first_and_limited() {
        let db = store().await;

        let mut tx = db.begin().await.unwrap();
        for i in 0..5 {
            tx.append_history(&NewHistoryEntry::new(
                HistoryAction::Created,
                format!("entry {i}"),
            ))
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let recent = db.list_history(3).await.unwrap();
        let descriptions: Vec<&str> = recent.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["entry 4", "entry 3", "entry 2"]);
        assert_eq!(recent[0].action, HistoryAction::Created);
    }

    #[tokio::test]
    async fn test_health_check() {
        let db = store().await;
        assert!(db.health_check().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_read_then_write_transactions_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("ledger.db")).max_connections(4))
            .await
            .unwrap();

        let mut tx = db.begin().await.unwrap();
        let a = tx.insert_item(&new_item("Hammer", 10)).await.unwrap();
        let b = tx.insert_item(&new_item("Saw", 10)).await.unwrap();
        tx.commit().await.unwrap();

        let mut handles = Vec::new();
        for n in 0..8 {
            let db = db.clone();
            let id = if n % 2 == 0 { a.id.clone() } else { b.id.clone() };
            handles.push(tokio::spawn(async move {
                let mut tx = db.begin().await?;
                let item = tx.get_item(&id).await?.unwrap();
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                tx.update_item(&Item {
                    stock: item.stock - 1,
                    ..item
                })
                .await?;
                tx.commit().await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // No decrement was lost
        assert_eq!(db.get_item(&a.id).await.unwrap().unwrap().stock, 6);
        assert_eq!(db.get_item(&b.id).await.unwrap().unwrap().stock, 6);
    }
}
