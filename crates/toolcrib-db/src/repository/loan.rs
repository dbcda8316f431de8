//! # Loan Repository
//!
//! Rows of `loans` and `loan_lines`.
//!
//! ## Loan Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Loan Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── insert() → loans row { status: active }                        │
//! │                   + one loan_lines row per cart line (position 0..n)   │
//! │                                                                         │
//! │  2. RETURN                                                             │
//! │     └── mark_returned() → { status: returned, return_date }            │
//! │         (conditional on status = 'active'; runs at most once)          │
//! │                                                                         │
//! │  Rows are never deleted.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use toolcrib_core::{CartLine, Loan, LoanStatus, NewLoan};

/// Row shape of `loans`.
#[derive(Debug, sqlx::FromRow)]
struct LoanRecord {
    id: String,
    responsible: String,
    location: String,
    loan_date: NaiveDate,
    signature: Option<String>,
    status: LoanStatus,
    return_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl LoanRecord {
    fn into_loan(self, lines: Vec<CartLine>) -> Loan {
        Loan {
            id: self.id,
            responsible: self.responsible,
            location: self.location,
            date: self.loan_date,
            lines,
            signature: self.signature,
            status: self.status,
            return_date: self.return_date,
            created_at: self.created_at,
        }
    }
}

/// Row shape of `loan_lines`.
#[derive(Debug, sqlx::FromRow)]
struct LoanLineRecord {
    loan_id: String,
    item_id: String,
    quantity: i64,
    name_snapshot: String,
}

impl From<LoanLineRecord> for CartLine {
    fn from(r: LoanLineRecord) -> Self {
        CartLine {
            item_id: r.item_id,
            quantity: r.quantity,
            name_snapshot: r.name_snapshot,
        }
    }
}

/// Repository for loans and their lines.
pub struct LoanRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> LoanRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        LoanRepository { conn }
    }

    /// Loans newest first, optionally filtered by status.
    ///
    /// Lines are fetched in one query and grouped in memory.
    pub async fn list(&mut self, status: Option<LoanStatus>) -> DbResult<Vec<Loan>> {
        let loans: Vec<LoanRecord> = sqlx::query_as(
            r#"
            SELECT id, responsible, location, loan_date, signature,
                   status, return_date, created_at
            FROM loans
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(status)
        .fetch_all(&mut *self.conn)
        .await?;

        let lines: Vec<LoanLineRecord> = sqlx::query_as(
            r#"
            SELECT l.loan_id, l.item_id, l.quantity, l.name_snapshot
            FROM loan_lines l
            INNER JOIN loans o ON o.id = l.loan_id
            WHERE (?1 IS NULL OR o.status = ?1)
            ORDER BY l.loan_id, l.position
            "#,
        )
        .bind(status)
        .fetch_all(&mut *self.conn)
        .await?;

        let mut by_loan: HashMap<String, Vec<CartLine>> = HashMap::new();
        for line in lines {
            by_loan
                .entry(line.loan_id.clone())
                .or_default()
                .push(CartLine::from(line));
        }

        debug!(count = loans.len(), ?status, "Listed loans");

        Ok(loans
            .into_iter()
            .map(|record| {
                let lines = by_loan.remove(&record.id).unwrap_or_default();
                record.into_loan(lines)
            })
            .collect())
    }

    /// Gets a loan with its lines.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<Loan>> {
        let record: Option<LoanRecord> = sqlx::query_as(
            r#"
            SELECT id, responsible, location, loan_date, signature,
                   status, return_date, created_at
            FROM loans
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let lines = self.get_lines(id).await?;
        Ok(Some(record.into_loan(lines)))
    }

    async fn get_lines(&mut self, loan_id: &str) -> DbResult<Vec<CartLine>> {
        let rows: Vec<LoanLineRecord> = sqlx::query_as(
            r#"
            SELECT loan_id, item_id, quantity, name_snapshot
            FROM loan_lines
            WHERE loan_id = ?1
            ORDER BY position
            "#,
        )
        .bind(loan_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Inserts an active loan and its lines.
    ///
    /// ## Snapshot Pattern
    /// Lines keep the item name as given; later renames or deletes do not
    /// touch them.
    pub async fn insert(&mut self, new: &NewLoan) -> DbResult<Loan> {
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

        debug!(id = %loan.id, lines = loan.lines.len(), "Inserting loan");

        sqlx::query(
            r#"
            INSERT INTO loans (
                id, responsible, location, loan_date, signature,
                status, return_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.responsible)
        .bind(&loan.location)
        .bind(loan.date)
        .bind(&loan.signature)
        .bind(loan.status)
        .bind(loan.return_date)
        .bind(loan.created_at)
        .execute(&mut *self.conn)
        .await?;

        for (position, line) in loan.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO loan_lines (loan_id, position, item_id, quantity, name_snapshot)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&loan.id)
            .bind(position as i64)
            .bind(&line.item_id)
            .bind(line.quantity)
            .bind(&line.name_snapshot)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(loan)
    }

    /// Marks an active loan returned.
    pub async fn mark_returned(&mut self, id: &str, at: DateTime<Utc>) -> DbResult<Loan> {
        let result = sqlx::query(
            r#"
            UPDATE loans SET
                status = 'returned',
                return_date = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Loan (active)", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Loan", id))
    }
}
