//! # Error Types
//!
//! Domain-specific error types for toolcrib-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  toolcrib-core errors (this file)                                      │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  toolcrib-db errors                                                    │
//! │  └── DbError          - Store operation failures                       │
//! │                                                                         │
//! │  toolcrib-ledger errors                                                │
//! │  └── LedgerError      - What callers of the services see               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → ApiError → client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Every variant names the item or loan involved so the message can be shown
/// to the person at the counter as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Not enough units available to lend.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Drill × 3)
    ///      │
    ///      ▼
    /// Check stock: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Drill", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Only 2 Drill available"
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Returning units would put more on the shelf than the item owns.
    #[error("Stock for {item} would exceed its total: stock {stock} + {returned} > total {total}")]
    StockOverflow {
        item: String,
        stock: i64,
        returned: i64,
        total: i64,
    },

    /// Lowering the total would leave a negative number of available units.
    ///
    /// ## When This Occurs
    /// - Total lowered below the number of units currently lent out
    #[error("Cannot set total of {item} to {new_total}: {on_loan} unit(s) are on loan")]
    NegativeStock {
        item: String,
        new_total: i64,
        on_loan: i64,
    },

    /// Item still has units out on loan.
    #[error("Cannot delete {item}: {on_loan} unit(s) are still on loan")]
    ItemOnLoan { item: String, on_loan: i64 },

    /// Loan has already been returned.
    #[error("Loan {0} has already been returned")]
    LoanAlreadyReturned(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store access so a malformed request never opens a
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., SKU with spaces, unknown status).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
