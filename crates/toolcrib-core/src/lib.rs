//! # toolcrib-core: Pure Domain Logic for the Tool Ledger
//!
//! This crate holds the rules of the tool-lending ledger as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toolcrib Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/server (axum HTTP + WebSocket)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       toolcrib-ledger (InventoryLedger, LoanEngine, Notifier)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ toolcrib-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │    sku    │  │   error   │  │ validation│  │   │
//! │  │   │ Item/Loan │  │ generator │  │ CoreError │  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 toolcrib-db (Persistence Store)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Loan, HistoryEntry, Topic)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//! - [`sku`] - SKU generation for items created without one
//!
//! ## Example Usage
//!
//! ```rust
//! use toolcrib_core::{Item, CoreError};
//! # use chrono::Utc;
//! # let now = Utc::now();
//! let drill = Item {
//!     id: "drill-1".into(),
//!     name: "Drill".into(),
//!     brand: "Bosch".into(),
//!     sku: "DR1234".into(),
//!     kind: "Power tool".into(),
//!     stock: 5,
//!     total: 5,
//!     created_at: now,
//!     updated_at: now,
//! };
//!
//! // Lending 3 units leaves 2 available
//! let lent = drill.with_stock_delta(-3).unwrap();
//! assert_eq!(lent.stock, 2);
//!
//! // Lending 6 more is impossible
//! assert!(matches!(
//!     lent.with_stock_delta(-6),
//!     Err(CoreError::InsufficientStock { .. })
//! ));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod sku;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use sku::generate_sku;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of cart lines in a single loan.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity on a single cart line.
///
/// Catches typing 100 instead of 10 at the counter.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum units an item may declare as owned.
pub const MAX_ITEM_UNITS: i64 = 100_000;

/// Upper bound (and default) for history reads.
pub const MAX_HISTORY_LIMIT: u32 = 100;
