//! # Loan Engine
//!
//! Checkout and return of loan tickets.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   [none] ── create_loan ──► Active ── return_loan ──► Returned          │
//! │                                                          │              │
//! │                                          return_loan ──► AlreadyReturned│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout Transaction
//! ```text
//! validate cart (no I/O)
//!      │
//!      ▼
//! begin ─► sum qty per item, compare with stock   (fast rejection)
//!      │
//!      ▼
//! insert loan (status Active, lines in order)
//!      │
//!      ▼
//! adjust_stock(item, -qty) for every line         (authoritative check)
//!      │
//!      ▼
//! append "Checkout" ─► commit ─► announce(inventory, loans, history)
//! ```
//! Any failure drops the transaction: no loan, no decrement, no history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use ts_rs::TS;

use crate::commit;
use crate::error::{log_rejection, LedgerError, LedgerResult};
use crate::history::{describe_loan, HistoryRecorder};
use crate::inventory::InventoryLedger;
use crate::notifier::{announce_all, ChangeNotifier};
use toolcrib_core::validation::{validate_cart, validate_label, validate_responsible};
use toolcrib_core::{CartLine, HistoryAction, Item, Loan, LoanStatus, NewLoan, Topic};
use toolcrib_db::LedgerStore;

// =============================================================================
// Requests
// =============================================================================

/// One requested line of a checkout.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoanLineRequest {
    #[serde(default)]
    pub item_id: String,
    #[serde(default, alias = "quantity")]
    pub qty: i64,
    /// Name to print on the ticket; the item's current name when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Payload of `CreateLoan`.
///
/// ```json
/// {
///   "responsible": "Ana",
///   "location": "Taller 2",
///   "date": "2024-05-01",
///   "items": [{ "itemId": "…", "qty": 3, "name": "Drill" }],
///   "signature": "data:image/png;base64,…"
/// }
/// ```
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoan {
    #[serde(default)]
    pub responsible: String,
    #[serde(default)]
    pub location: String,
    /// Defaults to today (UTC).
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LoanLineRequest>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl CreateLoan {
    fn into_new_loan(self) -> NewLoan {
        NewLoan {
            responsible: self.responsible.trim().to_string(),
            location: self.location.trim().to_string(),
            date: self.date.unwrap_or_else(|| Utc::now().date_naive()),
            lines: self
                .items
                .into_iter()
                .map(|line| CartLine {
                    item_id: line.item_id.trim().to_string(),
                    quantity: line.qty,
                    name_snapshot: line.name.map(|n| n.trim().to_string()).unwrap_or_default(),
                })
                .collect(),
            signature: self.signature.filter(|s| !s.is_empty()),
        }
    }
}

// =============================================================================
// Loan Engine
// =============================================================================

/// Topics announced after a loan commits.
const LOAN_TOPICS: [Topic; 3] = Topic::ALL;

#[derive(Clone)]
pub struct LoanEngine {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl LoanEngine {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        LoanEngine { store, notifier }
    }

    /// Loans newest first, optionally only those in `status`.
    pub async fn list_loans(&self, status: Option<LoanStatus>) -> LedgerResult<Vec<Loan>> {
        let loans = self.store.list_loans(status).await?;
        debug!(count = loans.len(), ?status, "Listed loans");
        Ok(loans)
    }

    pub async fn get_loan(&self, id: &str) -> LedgerResult<Loan> {
        self.store
            .get_loan(id)
            .await?
            .ok_or_else(|| LedgerError::loan_not_found(id))
    }

    /// Checks out every line of the cart as one ticket.
    pub async fn create_loan(&self, request: CreateLoan) -> LedgerResult<Loan> {
        let result = self.try_create_loan(request).await;
        match &result {
            Ok(loan) => {
                info!(
                    id = %loan.id,
                    responsible = %loan.responsible,
                    units = loan.total_units(),
                    "Loan created"
                );
                announce_all(self.notifier.as_ref(), &LOAN_TOPICS);
            }
            Err(e) => log_rejection("create_loan", e),
        }
        result
    }

    async fn try_create_loan(&self, request: CreateLoan) -> LedgerResult<Loan> {
        let mut new_loan = request.into_new_loan();
        validate_responsible(&new_loan.responsible)?;
        validate_label("location", &new_loan.location)?;
        validate_cart(&new_loan.lines)?;

        let mut tx = self.store.begin().await?;

        // Summed per item so two lines for the same item can't each pass alone
        let mut items: HashMap<String, Item> = HashMap::new();
        for (item_id, requested) in new_loan.requested_units() {
            let item = tx
                .get_item(item_id)
                .await?
                .ok_or_else(|| LedgerError::item_not_found(item_id))?;
            if requested > item.stock {
                return Err(LedgerError::InsufficientStock {
                    item: item.name,
                    available: item.stock,
                    requested,
                });
            }
            items.insert(item.id.clone(), item);
        }

        for line in &mut new_loan.lines {
            if line.name_snapshot.is_empty() {
                if let Some(item) = items.get(&line.item_id) {
                    line.name_snapshot = item.name.clone();
                }
            }
        }

        let loan = tx.insert_loan(&new_loan).await?;
        for line in &loan.lines {
            InventoryLedger::adjust_stock(tx.as_mut(), &line.item_id, -line.quantity).await?;
        }
        HistoryRecorder::record(tx.as_mut(), HistoryAction::Checkout, describe_loan(&loan))
            .await?;
        commit(tx).await?;

        Ok(loan)
    }

    /// Returns every unit of an active loan to the shelf.
    pub async fn return_loan(&self, id: &str) -> LedgerResult<Loan> {
        let result = self.try_return_loan(id).await;
        match &result {
            Ok(loan) => {
                info!(id = %loan.id, units = loan.total_units(), "Loan returned");
                announce_all(self.notifier.as_ref(), &LOAN_TOPICS);
            }
            Err(e) => log_rejection("return_loan", e),
        }
        result
    }

    async fn try_return_loan(&self, id: &str) -> LedgerResult<Loan> {
        let mut tx = self.store.begin().await?;

        let loan = tx
            .get_loan(id)
            .await?
            .ok_or_else(|| LedgerError::loan_not_found(id))?;
        loan.ensure_active()?;

        let returned = tx.mark_returned(id, Utc::now()).await?;
        for line in &returned.lines {
            InventoryLedger::adjust_stock(tx.as_mut(), &line.item_id, line.quantity).await?;
        }
        HistoryRecorder::record(tx.as_mut(), HistoryAction::Return, describe_loan(&returned))
            .await?;
        commit(tx).await?;

        Ok(returned)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::inventory::CreateItem;
    use crate::notifier::RecordingNotifier;
    use toolcrib_db::{Database, DbConfig, MemoryStore};

    struct Fixture {
        store: Arc<dyn LedgerStore>,
        notifier: Arc<RecordingNotifier>,
        inventory: InventoryLedger,
        loans: LoanEngine,
    }

    fn fixture_with(store: Arc<dyn LedgerStore>) -> Fixture {
        let notifier = Arc::new(RecordingNotifier::new());
        Fixture {
            inventory: InventoryLedger::new(store.clone(), notifier.clone()),
            loans: LoanEngine::new(store.clone(), notifier.clone()),
            store,
            notifier,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryStore::new()))
    }

    async fn sqlite_fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        fixture_with(Arc::new(db))
    }

    /// File database with a real pool; keep the `TempDir` alive for the test.
    async fn file_fixture(max_connections: u32) -> (tempfile::TempDir, Fixture) {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("toolcrib.db")).max_connections(max_connections);
        let db = Database::new(config).await.unwrap();
        (dir, fixture_with(Arc::new(db)))
    }

    async fn add_item(f: &Fixture, name: &str, stock: i64) -> Item {
        let item = f
            .inventory
            .create_item(CreateItem {
                name: name.to_string(),
                stock,
                ..Default::default()
            })
            .await
            .unwrap();
        f.notifier.clear();
        item
    }

    fn checkout(lines: &[(&str, i64)]) -> CreateLoan {
        CreateLoan {
            responsible: "Ana".to_string(),
            location: "Taller 2".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            items: lines
                .iter()
                .map(|(item_id, qty)| LoanLineRequest {
                    item_id: item_id.to_string(),
                    qty: *qty,
                    name: None,
                })
                .collect(),
            signature: Some("data:image/png;base64,AAAA".to_string()),
        }
    }

    async fn stock_of(f: &Fixture, id: &str) -> (i64, i64) {
        let item = f.store.get_item(id).await.unwrap().unwrap();
        (item.stock, item.total)
    }

    async fn history_len(f: &Fixture) -> usize {
        f.store.list_history(100).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_drill_round_trip() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 5).await;

        let loan = f.loans.create_loan(checkout(&[(drill.id.as_str(), 3)])).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.lines[0].name_snapshot, "Drill");
        assert_eq!(stock_of(&f, &drill.id).await, (2, 5));

        let history = f.store.list_history(100).await.unwrap();
        assert_eq!(history[0].action, HistoryAction::Checkout);
        assert_eq!(history.len(), 2); // Created + Checkout
        assert_eq!(f.notifier.topics(), Topic::ALL.to_vec());

        let returned = f.loans.return_loan(&loan.id).await.unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert!(returned.return_date.is_some());
        assert_eq!(stock_of(&f, &drill.id).await, (5, 5));

        let history = f.store.list_history(100).await.unwrap();
        assert_eq!(history[0].action, HistoryAction::Return);
        assert_eq!(history.len(), 3);
        assert_eq!(f.notifier.topics().len(), 6);
    }

    #[tokio::test]
    async fn test_double_return_conflicts() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 5).await;
        let loan = f.loans.create_loan(checkout(&[(drill.id.as_str(), 2)])).await.unwrap();

        f.loans.return_loan(&loan.id).await.unwrap();
        f.notifier.clear();
        let before = history_len(&f).await;

        let err = f.loans.return_loan(&loan.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err, LedgerError::AlreadyReturned(_)));

        assert_eq!(stock_of(&f, &drill.id).await, (5, 5));
        assert_eq!(history_len(&f).await, before);
        assert!(f.notifier.topics().is_empty());
    }

    #[tokio::test]
    async fn test_return_unknown_loan() {
        let f = fixture();
        let err = f.loans.return_loan("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_commits_nothing() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 2).await;
        let saw = add_item(&f, "Saw", 4).await;
        let before = history_len(&f).await;

        let err = f
            .loans
            .create_loan(checkout(&[(saw.id.as_str(), 1), (drill.id.as_str(), 3)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        assert_eq!(stock_of(&f, &drill.id).await, (2, 2));
        assert_eq!(stock_of(&f, &saw.id).await, (4, 4));
        assert!(f.loans.list_loans(None).await.unwrap().is_empty());
        assert_eq!(history_len(&f).await, before);
        assert!(f.notifier.topics().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_lines_are_summed_and_kept_separate() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 3).await;

        // 2 + 2 > 3 even though each line fits on its own
        let err = f
            .loans
            .create_loan(checkout(&[(drill.id.as_str(), 2), (drill.id.as_str(), 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));

        let loan = f
            .loans
            .create_loan(checkout(&[(drill.id.as_str(), 2), (drill.id.as_str(), 1)]))
            .await
            .unwrap();
        assert_eq!(loan.lines.len(), 2);
        assert_eq!(stock_of(&f, &drill.id).await, (0, 3));
    }

    #[tokio::test]
    async fn test_unknown_item_in_cart() {
        let f = fixture();
        let err = f
            .loans
            .create_loan(checkout(&[("missing", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cart_validation() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 3).await;

        let err = f.loans.create_loan(checkout(&[])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = f
            .loans
            .create_loan(checkout(&[(drill.id.as_str(), 0)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut no_one = checkout(&[(drill.id.as_str(), 1)]);
        no_one.responsible = " ".to_string();
        let err = f.loans.create_loan(no_one).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(stock_of(&f, &drill.id).await, (3, 3));
    }

    #[tokio::test]
    async fn test_caller_name_snapshot_wins() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 3).await;

        let mut request = checkout(&[(drill.id.as_str(), 1)]);
        request.items[0].name = Some("Taladro azul".to_string());
        let loan = f.loans.create_loan(request).await.unwrap();
        assert_eq!(loan.lines[0].name_snapshot, "Taladro azul");
    }

    #[tokio::test]
    async fn test_aborted_checkout_leaves_stores_untouched() {
        let store = MemoryStore::new();
        let f = fixture_with(Arc::new(store.clone()));
        let drill = add_item(&f, "Drill", 5).await;
        let before = history_len(&f).await;

        store.fail_next_commit();
        let err = f
            .loans
            .create_loan(checkout(&[(drill.id.as_str(), 3)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionAborted);

        assert_eq!(stock_of(&f, &drill.id).await, (5, 5));
        assert!(f.loans.list_loans(None).await.unwrap().is_empty());
        assert_eq!(history_len(&f).await, before);
        assert!(f.notifier.topics().is_empty());
    }

    #[tokio::test]
    async fn test_aborted_return_leaves_loan_active() {
        let store = MemoryStore::new();
        let f = fixture_with(Arc::new(store.clone()));
        let drill = add_item(&f, "Drill", 5).await;
        let loan = f.loans.create_loan(checkout(&[(drill.id.as_str(), 3)])).await.unwrap();
        f.notifier.clear();

        store.fail_next_commit();
        let err = f.loans.return_loan(&loan.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionAborted);

        assert_eq!(f.loans.get_loan(&loan.id).await.unwrap().status, LoanStatus::Active);
        assert_eq!(stock_of(&f, &drill.id).await, (2, 5));
        assert!(f.notifier.topics().is_empty());
    }

    #[tokio::test]
    async fn test_list_loans_by_status() {
        let f = fixture();
        let drill = add_item(&f, "Drill", 5).await;
        let first = f.loans.create_loan(checkout(&[(drill.id.as_str(), 1)])).await.unwrap();
        let second = f.loans.create_loan(checkout(&[(drill.id.as_str(), 1)])).await.unwrap();
        f.loans.return_loan(&first.id).await.unwrap();

        let all = f.loans.list_loans(None).await.unwrap();
        assert_eq!(
            all.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec![second.id.as_str(), first.id.as_str()]
        );

        let active = f.loans.list_loans(Some(LoanStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let f = sqlite_fixture().await;
        let drill = add_item(&f, "Drill", 5).await;

        let loan = f.loans.create_loan(checkout(&[(drill.id.as_str(), 3)])).await.unwrap();
        assert_eq!(stock_of(&f, &drill.id).await, (2, 5));

        let err = f.inventory.delete_item(&drill.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        f.loans.return_loan(&loan.id).await.unwrap();
        assert_eq!(stock_of(&f, &drill.id).await, (5, 5));

        let fetched = f.loans.get_loan(&loan.id).await.unwrap();
        assert_eq!(fetched.status, LoanStatus::Returned);
        assert_eq!(fetched.lines[0].name_snapshot, "Drill");

        // Lines outlive the item
        f.inventory.delete_item(&drill.id).await.unwrap();
        let fetched = f.loans.get_loan(&loan.id).await.unwrap();
        assert_eq!(fetched.lines.len(), 1);
    }

    async fn concurrent_checkouts(f: Fixture) {
        let drill = add_item(&f, "Drill", 10).await;

        let mut handles = Vec::new();
        for _ in 0..24 {
            let loans = f.loans.clone();
            let id = drill.id.clone();
            handles.push(tokio::spawn(async move {
                loans
                    .create_loan(checkout(&[(id.as_str(), 1)]))
                    .await
                    .map(|loan| loan.total_units())
            }));
        }

        let mut lent = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(units) => lent += units,
                Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidState, "unexpected {e:?}"),
            }
        }

        // 24 requests for one unit each against 10 units
        assert_eq!(lent, 10);
        assert_eq!(stock_of(&f, &drill.id).await, (0, 10));

        let on_loan: i64 = f
            .loans
            .list_loans(Some(LoanStatus::Active))
            .await
            .unwrap()
            .iter()
            .map(Loan::total_units)
            .sum();
        assert_eq!(on_loan, lent);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_memory() {
        concurrent_checkouts(fixture()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_sqlite() {
        concurrent_checkouts(sqlite_fixture().await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_sqlite_file() {
        let (_dir, f) = file_fixture(5).await;
        concurrent_checkouts(f).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_across_items_all_commit() {
        let (_dir, f) = file_fixture(5).await;

        let mut items = Vec::new();
        for i in 0..8 {
            items.push(add_item(&f, &format!("Clamp {i}"), 100).await);
        }

        let mut handles = Vec::new();
        for n in 0..40 {
            let loans = f.loans.clone();
            let id = items[n % items.len()].id.clone();
            handles.push(tokio::spawn(async move {
                loans.create_loan(checkout(&[(id.as_str(), 1)])).await
            }));
        }

        let mut lent = 0;
        for handle in handles {
            // Writers wait for the lock; none should be aborted
            let loan = handle.await.unwrap().unwrap();
            lent += loan.total_units();
        }
        assert_eq!(lent, 40);

        for item in &items {
            assert_eq!(stock_of(&f, &item.id).await, (95, 100));
        }

        let active = f.loans.list_loans(Some(LoanStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 40);
        assert_eq!(active.iter().map(Loan::total_units).sum::<i64>(), 40);
        // 8 Created + 40 Checkout
        assert_eq!(f.store.list_history(100).await.unwrap().len(), 48);
    }
}
