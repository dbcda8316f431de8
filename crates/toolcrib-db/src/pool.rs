//! # SQLite Pool and Writer Discipline
//!
//! Opens the ledger database and decides how transactions take SQLite's
//! single write lock.
//!
//! ## Writers Queue, They Don't Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/loans ──► begin_write ──► BEGIN IMMEDIATE ──► lock held      │
//! │  PUT  /api/items ──► begin_write ──► BEGIN IMMEDIATE ──► busy handler   │
//! │  POST /api/loans ──► begin_write ──► BEGIN IMMEDIATE ──► busy handler   │
//! │                                                │            (waits up   │
//! │                                                ▼             to busy_   │
//! │                                           COMMIT             timeout)   │
//! │                                                │                        │
//! │                                  next writer takes the lock            │
//! │                                                                         │
//! │  GET /api/items ──► pooled read (WAL: never waits for the writer)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A deferred `BEGIN` would let two ledger transactions both read and then
//! both try to write; SQLite refuses the second upgrade with `SQLITE_BUSY`
//! without calling the busy handler. Every ledger transaction reads before it
//! writes, so the write lock is taken up front instead.
//!
//! Only a writer that waits longer than [`DbConfig::busy_timeout`] fails,
//! with `DbError::TransactionConflict`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

/// How a write transaction starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginMode {
    /// `BEGIN IMMEDIATE`: take the write lock before the first read.
    Immediate,
    /// `BEGIN`: take it at the first write. Concurrent writers may then fail
    /// with `SQLITE_BUSY` instead of waiting.
    Deferred,
}

impl BeginMode {
    pub fn statement(self) -> &'static str {
        match self {
            BeginMode::Immediate => "BEGIN IMMEDIATE",
            BeginMode::Deferred => "BEGIN",
        }
    }
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Private to the pool; gone when its last connection closes.
    Memory,
}

/// Database configuration.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/toolcrib/toolcrib.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: Location,

    /// Pool size. Readers use all of them; writers still go one at a time.
    /// Default: 5
    pub max_connections: u32,

    /// Default: 1
    pub min_connections: u32,

    /// How long a writer waits for the write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// How long a request waits for a free pooled connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Idle connections above `min_connections` are closed after this.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Default: [`BeginMode::Immediate`]
    pub begin_mode: BeginMode,

    /// Apply embedded migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file database; the file is created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: Location::File(path.into()),
            max_connections: 5,
            min_connections: 1,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            begin_mode: BeginMode::Immediate,
            run_migrations: true,
        }
    }

    /// A private in-memory database on a single connection (tests).
    pub fn in_memory() -> Self {
        DbConfig {
            location: Location::Memory,
            max_connections: 1,
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn begin_mode(mut self, mode: BeginMode) -> Self {
        self.begin_mode = mode;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.location {
            Location::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            Location::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
        };

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            // May lose the last commit on power loss, never corrupts
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// SQLite-backed ledger store.
///
/// Cloning is cheap (the pool is reference counted). Implements
/// [`LedgerStore`](crate::store::LedgerStore) in `sqlite.rs`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    begin_mode: BeginMode,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            location = ?config.location,
            max_connections = config.max_connections,
            begin = config.begin_mode.statement(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout);
        pool_options = match &config.location {
            // Recycling the only connection would drop the database
            Location::Memory => pool_options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>),
            Location::File(_) => pool_options.idle_timeout(Some(config.idle_timeout)),
        };

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!("Pool connected");

        let db = Database {
            pool,
            begin_mode: config.begin_mode,
        };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    /// Opens a write transaction according to the configured [`BeginMode`].
    ///
    /// Waits up to the busy timeout while another writer holds the lock.
    pub async fn begin_write(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with(self.begin_mode.statement()).await?)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// After this every store operation fails with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// `true` when a pooled connection answers `SELECT 1`.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
