//! # Domain Types
//!
//! Core domain types used throughout the ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │      Loan       │   │  HistoryEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (label)    │   │  responsible    │   │  action         │       │
//! │  │  stock          │◄──│  lines[]        │   │  description    │       │
//! │  │  total          │   │  status         │   │  created_at     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Invariant: 0 ≤ stock ≤ total, checked after every mutation            │
//! │  Loan:      [none] → Active → Returned (terminal)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Cart lines copy the item name at checkout time so a loan stays readable
//! after the item is renamed or deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Item
// =============================================================================

/// A kind of tool tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Store-assigned identifier (UUID v4).
    pub id: String,

    /// Display name shown on loan tickets.
    pub name: String,

    pub brand: String,

    /// Human label, not guaranteed unique.
    pub sku: String,

    /// Category ("type" on the wire).
    #[serde(rename = "type")]
    pub kind: String,

    /// Units currently available to lend.
    pub stock: i64,

    /// Units owned in any state (available + lent out).
    pub total: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Units currently out on loan.
    #[inline]
    pub fn on_loan(&self) -> i64 {
        self.total - self.stock
    }

    /// Checks `0 ≤ stock ≤ total`.
    pub fn check_invariant(&self) -> CoreResult<()> {
        if self.stock < 0 {
            return Err(CoreError::InsufficientStock {
                item: self.name.clone(),
                available: self.stock,
                requested: 0,
            });
        }
        if self.stock > self.total {
            return Err(CoreError::StockOverflow {
                item: self.name.clone(),
                stock: self.stock,
                returned: 0,
                total: self.total,
            });
        }
        Ok(())
    }

    /// Returns a copy with `stock` shifted by `delta`.
    ///
    /// ## Stock Adjustment
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  delta < 0  (checkout)   stock + delta < 0      → InsufficientStock │
    /// │  delta > 0  (return)     stock + delta > total  → StockOverflow     │
    /// │  otherwise               stock = stock + delta                      │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    pub fn with_stock_delta(&self, delta: i64) -> CoreResult<Item> {
        let stock = self.stock + delta;

        if stock < 0 {
            return Err(CoreError::InsufficientStock {
                item: self.name.clone(),
                available: self.stock,
                requested: -delta,
            });
        }

        if stock > self.total {
            return Err(CoreError::StockOverflow {
                item: self.name.clone(),
                stock: self.stock,
                returned: delta,
                total: self.total,
            });
        }

        Ok(Item {
            stock,
            ..self.clone()
        })
    }

    /// Returns a copy with a new `total`, shifting `stock` by the same delta.
    ///
    /// Lowering the total below the units on loan is rejected; there is no
    /// other lower bound.
    pub fn with_total(&self, new_total: i64) -> CoreResult<Item> {
        let diff = new_total - self.total;
        let stock = self.stock + diff;

        if stock < 0 {
            return Err(CoreError::NegativeStock {
                item: self.name.clone(),
                new_total,
                on_loan: self.on_loan(),
            });
        }

        let item = Item {
            stock,
            total: new_total,
            ..self.clone()
        };
        item.check_invariant()?;
        Ok(item)
    }

    /// Deletion is allowed only when every unit is back on the shelf.
    pub fn ensure_deletable(&self) -> CoreResult<()> {
        if self.stock < self.total {
            return Err(CoreError::ItemOnLoan {
                item: self.name.clone(),
                on_loan: self.on_loan(),
            });
        }
        Ok(())
    }
}

/// Data for a new item; the store assigns id and timestamps.
///
/// New items start with every unit available (`stock == total`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub brand: String,
    pub sku: String,
    pub kind: String,
    pub total: i64,
}

// =============================================================================
// Loan Status
// =============================================================================

/// Status of a loan ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Units are out.
    Active,
    /// Units came back. Terminal.
    Returned,
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Active
    }
}

impl LoanStatus {
    /// Wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("'{}' is not one of: active, returned", other),
            }),
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of a loan: an item and how many units were taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: String,
    pub quantity: i64,
    /// Item name at checkout time (frozen).
    pub name_snapshot: String,
}

// =============================================================================
// Loan
// =============================================================================

/// One checkout event covering one or more items ("ticket").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,

    /// Person who took the tools.
    pub responsible: String,

    /// Where the tools are going (site, workshop, classroom).
    pub location: String,

    /// Loan date as declared by the person at the counter.
    #[ts(as = "String")]
    pub date: NaiveDate,

    /// Cart lines in the order they were submitted.
    pub lines: Vec<CartLine>,

    /// Opaque signature artifact (typically a data URL from a signature pad).
    pub signature: Option<String>,

    pub status: LoanStatus,

    #[ts(as = "Option<String>")]
    pub return_date: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Sum of quantities over all lines.
    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// A loan can be returned exactly once.
    pub fn ensure_active(&self) -> CoreResult<()> {
        match self.status {
            LoanStatus::Active => Ok(()),
            LoanStatus::Returned => Err(CoreError::LoanAlreadyReturned(self.id.clone())),
        }
    }
}

/// Data for a new loan; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub responsible: String,
    pub location: String,
    pub date: NaiveDate,
    pub lines: Vec<CartLine>,
    pub signature: Option<String>,
}

impl NewLoan {
    /// Requested units per item, in order of first appearance.
    ///
    /// Lines are never merged when stored; this is only used to reject a cart
    /// up front when two lines together ask for more than is available.
    pub fn requested_units(&self) -> Vec<(&str, i64)> {
        let mut totals: Vec<(&str, i64)> = Vec::new();
        for line in &self.lines {
            match totals.iter_mut().find(|(id, _)| *id == line.item_id) {
                Some((_, qty)) => *qty += line.quantity,
                None => totals.push((line.item_id.as_str(), line.quantity)),
            }
        }
        totals
    }
}

// =============================================================================
// History
// =============================================================================

/// Kind of ledger-affecting action recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Deleted,
    Edited,
    Checkout,
    Return,
}

impl HistoryAction {
    /// Label shown in the tool-room log.
    pub fn label(&self) -> &'static str {
        match self {
            HistoryAction::Created => "Alta",
            HistoryAction::Deleted => "Baja",
            HistoryAction::Edited => "Edición",
            HistoryAction::Checkout => "Salida",
            HistoryAction::Return => "Devolución",
        }
    }
}

/// Immutable audit record of one ledger-affecting action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub action: HistoryAction,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Data for a new history entry; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub action: HistoryAction,
    pub description: String,
}

impl NewHistoryEntry {
    pub fn new(action: HistoryAction, description: impl Into<String>) -> Self {
        NewHistoryEntry {
            action,
            description: description.into(),
        }
    }
}

// =============================================================================
// Change Topics
// =============================================================================

/// What changed; observers re-fetch the matching read endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    InventoryChanged,
    LoansChanged,
    HistoryChanged,
}

impl Topic {
    /// Every topic, in announce order.
    pub const ALL: [Topic; 3] = [
        Topic::InventoryChanged,
        Topic::LoansChanged,
        Topic::HistoryChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::InventoryChanged => "inventory-changed",
            Topic::LoansChanged => "loans-changed",
            Topic::HistoryChanged => "history-changed",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(stock: i64, total: i64) -> Item {
        let now = Utc::now();
        Item {
            id: "item-1".to_string(),
            name: "Drill".to_string(),
            brand: "Bosch".to_string(),
            sku: "DR1234".to_string(),
            kind: "Power tool".to_string(),
            stock,
            total,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_delta_checkout_and_return() {
        let lent = item(5, 5).with_stock_delta(-3).unwrap();
        assert_eq!((lent.stock, lent.total), (2, 5));

        let back = lent.with_stock_delta(3).unwrap();
        assert_eq!((back.stock, back.total), (5, 5));
    }

    #[test]
    fn test_stock_delta_rejects_negative() {
        let err = item(2, 5).with_stock_delta(-3).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                item: "Drill".to_string(),
                available: 2,
                requested: 3,
            }
        );
    }

    #[test]
    fn test_stock_delta_rejects_over_total() {
        let err = item(4, 5).with_stock_delta(2).unwrap_err();
        assert!(matches!(err, CoreError::StockOverflow { .. }));
    }

    #[test]
    fn test_with_total_shifts_stock_by_delta() {
        // 3 of 5 lent out, stock 2
        let raised = item(2, 5).with_total(8).unwrap();
        assert_eq!((raised.stock, raised.total), (5, 8));

        let lowered = item(2, 5).with_total(3).unwrap();
        assert_eq!((lowered.stock, lowered.total), (0, 3));
    }

    #[test]
    fn test_with_total_rejects_below_on_loan() {
        let err = item(2, 5).with_total(2).unwrap_err();
        assert_eq!(
            err,
            CoreError::NegativeStock {
                item: "Drill".to_string(),
                new_total: 2,
                on_loan: 3,
            }
        );
    }

    #[test]
    fn test_ensure_deletable() {
        assert!(item(5, 5).ensure_deletable().is_ok());
        assert!(matches!(
            item(2, 5).ensure_deletable(),
            Err(CoreError::ItemOnLoan { on_loan: 3, .. })
        ));
    }

    #[test]
    fn test_loan_state_machine() {
        let mut loan = Loan {
            id: "loan-1".to_string(),
            responsible: "Ana".to_string(),
            location: "Taller 2".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            lines: vec![
                CartLine {
                    item_id: "a".to_string(),
                    quantity: 2,
                    name_snapshot: "Drill".to_string(),
                },
                CartLine {
                    item_id: "b".to_string(),
                    quantity: 1,
                    name_snapshot: "Saw".to_string(),
                },
            ],
            signature: None,
            status: LoanStatus::default(),
            return_date: None,
            created_at: Utc::now(),
        };
        assert_eq!(loan.total_units(), 3);
        assert!(loan.ensure_active().is_ok());

        loan.status = LoanStatus::Returned;
        assert_eq!(
            loan.ensure_active().unwrap_err(),
            CoreError::LoanAlreadyReturned("loan-1".to_string())
        );
    }

    #[test]
    fn test_requested_units_sums_repeated_items() {
        let line = |id: &str, quantity| CartLine {
            item_id: id.to_string(),
            quantity,
            name_snapshot: String::new(),
        };
        let loan = NewLoan {
            responsible: "Ana".to_string(),
            location: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            lines: vec![line("a", 2), line("b", 1), line("a", 3)],
            signature: None,
        };
        assert_eq!(loan.requested_units(), vec![("a", 5), ("b", 1)]);
    }

    #[test]
    fn test_loan_status_parse() {
        assert_eq!("Active".parse::<LoanStatus>().unwrap(), LoanStatus::Active);
        assert_eq!("returned".parse::<LoanStatus>().unwrap(), LoanStatus::Returned);
        assert!("lost".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&Topic::InventoryChanged).unwrap(),
            "\"inventory-changed\""
        );
        assert_eq!(Topic::LoansChanged.to_string(), "loans-changed");

        let json = serde_json::to_value(item(5, 5)).unwrap();
        assert_eq!(json["type"], "Power tool");
        assert!(json.get("createdAt").is_some());

        assert_eq!(HistoryAction::Return.label(), "Devolución");
    }
}
