//! # History Repository
//!
//! Append-only rows of `history`. There is no update or delete.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::DbResult;
use toolcrib_core::{HistoryAction, HistoryEntry, NewHistoryEntry};

#[derive(Debug, sqlx::FromRow)]
struct HistoryRecord {
    id: String,
    action: HistoryAction,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(r: HistoryRecord) -> Self {
        HistoryEntry {
            id: r.id,
            action: r.action,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

pub struct HistoryRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> HistoryRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        HistoryRepository { conn }
    }

    pub async fn append(&mut self, new: &NewHistoryEntry) -> DbResult<HistoryEntry> {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            action: new.action,
            description: new.description.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO history (id, action, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.action)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    /// Most recent entries, newest first.
    pub async fn list_recent(&mut self, limit: u32) -> DbResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRecord> = sqlx::query_as(
            r#"
            SELECT id, action, description, created_at
            FROM history
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }
}
