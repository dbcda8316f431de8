//! # toolcrib-db: Persistence Store for the Tool Ledger
//!
//! Transactional storage behind the [`LedgerStore`] / [`StoreTx`] traits,
//! with a SQLite implementation ([`Database`]) and an in-memory one
//! ([`MemoryStore`]).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toolcrib Data Flow                               │
//! │                                                                         │
//! │  toolcrib-ledger (InventoryLedger, LoanEngine, HistoryRecorder)        │
//! │       │   Arc<dyn LedgerStore>                                         │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    toolcrib-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  store.rs     │    │  sqlite.rs    │    │  memory.rs   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ LedgerStore   │◄───│ Database      │    │ MemoryStore  │  │   │
//! │  │   │ StoreTx       │◄───│ SqliteTx      │    │ MemoryTx     │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │             pool.rs / migrations.rs / repository/*              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolcrib_db::{Database, DbConfig, LedgerStore};
//!
//! let db = Database::new(DbConfig::new("toolcrib.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let item = tx.insert_item(&new_item).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sqlite;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use migrations::MigrationStatus;
pub use pool::{BeginMode, Database, DbConfig, Location};
pub use sqlite::SqliteTx;
pub use store::{LedgerStore, StoreTx};
