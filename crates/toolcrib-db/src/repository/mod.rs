//! # Repository Module
//!
//! SQL for each table, isolated in one place.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories over a borrowed connection              │
//! │                                                                         │
//! │  Database (LedgerStore)            SqliteTx (StoreTx)                  │
//! │  pool.acquire()                    pool.begin()                         │
//! │       │                                 │                               │
//! │       └──────────────┬──────────────────┘                               │
//! │                      ▼                                                  │
//! │              &mut SqliteConnection                                      │
//! │                      │                                                  │
//! │       ┌──────────────┼──────────────────┐                               │
//! │       ▼              ▼                  ▼                               │
//! │  ItemRepository  LoanRepository  HistoryRepository                      │
//! │       │              │                  │                               │
//! │       ▼              ▼                  ▼                               │
//! │     items      loans + loan_lines    history                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same query code serves committed reads (pooled connection) and reads
//! inside a transaction (the transaction's connection).

pub mod history;
pub mod item;
pub mod loan;

pub use history::HistoryRepository;
pub use item::ItemRepository;
pub use loan::LoanRepository;
