//! # Ledger Error Types
//!
//! What callers of the ledger services see.
//!
//! ## Error Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind            LedgerError variants                              │
//! │  ──────────           ────────────────────                              │
//! │  Validation           Validation                                        │
//! │  NotFound             NotFound                                          │
//! │  Conflict             ItemOnLoan, AlreadyReturned                       │
//! │  InvalidState         InsufficientStock, NegativeStock, StockOverflow   │
//! │  TransactionAborted   TransactionAborted                                │
//! │  Store                Store                                             │
//! │                                                                         │
//! │  None of them is retried by the ledger; the caller decides.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use tracing::{error, warn};

use toolcrib_core::{CoreError, ValidationError};
use toolcrib_db::DbError;

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InvalidState,
    TransactionAborted,
    Store,
}

/// Errors returned by the ledger services.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing or malformed input. Raised before any transaction is opened.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown item or loan id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Delete refused while units are out on loan.
    #[error("Cannot delete {item}: {on_loan} unit(s) are still on loan")]
    ItemOnLoan { item: String, on_loan: i64 },

    /// Second return of the same loan.
    #[error("Loan {0} has already been returned")]
    AlreadyReturned(String),

    /// Checkout asks for more than is on the shelf.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Edit would leave a negative number of available units.
    #[error("Cannot set total of {item} to {new_total}: {on_loan} unit(s) are on loan")]
    NegativeStock {
        item: String,
        new_total: i64,
        on_loan: i64,
    },

    /// Return would put more units on the shelf than the item owns.
    #[error("Stock for {item} would exceed its total: stock {stock} + {returned} > total {total}")]
    StockOverflow {
        item: String,
        stock: i64,
        returned: i64,
        total: i64,
    },

    /// The store refused to commit; nothing was applied.
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    /// Any other store failure.
    #[error("Store error: {0}")]
    Store(DbError),
}

impl LedgerError {
    pub fn item_not_found(id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: "Item".to_string(),
            id: id.into(),
        }
    }

    pub fn loan_not_found(id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: "Loan".to_string(),
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::ItemOnLoan { .. } | LedgerError::AlreadyReturned(_) => ErrorKind::Conflict,
            LedgerError::InsufficientStock { .. }
            | LedgerError::NegativeStock { .. }
            | LedgerError::StockOverflow { .. } => ErrorKind::InvalidState,
            LedgerError::TransactionAborted(_) => ErrorKind::TransactionAborted,
            LedgerError::Store(_) => ErrorKind::Store,
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                item,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                item,
                available,
                requested,
            },
            CoreError::StockOverflow {
                item,
                stock,
                returned,
                total,
            } => LedgerError::StockOverflow {
                item,
                stock,
                returned,
                total,
            },
            CoreError::NegativeStock {
                item,
                new_total,
                on_loan,
            } => LedgerError::NegativeStock {
                item,
                new_total,
                on_loan,
            },
            CoreError::ItemOnLoan { item, on_loan } => LedgerError::ItemOnLoan { item, on_loan },
            CoreError::LoanAlreadyReturned(id) => LedgerError::AlreadyReturned(id),
            CoreError::Validation(e) => LedgerError::Validation(e),
        }
    }
}

/// ## Error Mapping
/// ```text
/// DbError::TransactionConflict → TransactionAborted
/// DbError::NotFound            → NotFound
/// Other                        → Store
/// ```
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::TransactionConflict(msg) => LedgerError::TransactionAborted(msg),
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            other => LedgerError::Store(other),
        }
    }
}

/// Logs a refused ledger operation: `warn!` for caller-facing rejections,
/// `error!` for store failures.
pub(crate) fn log_rejection(operation: &'static str, err: &LedgerError) {
    match err.kind() {
        ErrorKind::Store => error!(operation, error = %err, "Ledger operation failed"),
        kind => warn!(operation, ?kind, error = %err, "Ledger operation rejected"),
    }
}

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_keep_kind() {
        let err: LedgerError = CoreError::ItemOnLoan {
            item: "Saw".to_string(),
            on_loan: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Cannot delete Saw: 3 unit(s) are still on loan");

        let err: LedgerError = CoreError::LoanAlreadyReturned("l-1".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: LedgerError = CoreError::InsufficientStock {
            item: "Drill".to_string(),
            available: 2,
            requested: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err: LedgerError = CoreError::Validation(ValidationError::required("name")).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_db_errors() {
        let err: LedgerError = DbError::TransactionConflict("database is locked".into()).into();
        assert_eq!(err.kind(), ErrorKind::TransactionAborted);

        let err: LedgerError = DbError::not_found("Item", "x").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: LedgerError = DbError::PoolExhausted.into();
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
