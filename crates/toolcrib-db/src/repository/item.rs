//! # Item Repository
//!
//! Rows of the `items` table.
//!
//! `stock` and `total` are written together on every update; the table's
//! CHECK constraint rejects any row outside `0 ≤ stock ≤ total`.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use toolcrib_core::{Item, NewItem};

/// Row shape of `items`.
#[derive(Debug, sqlx::FromRow)]
struct ItemRecord {
    id: String,
    name: String,
    brand: String,
    sku: String,
    item_type: String,
    stock: i64,
    total: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRecord> for Item {
    fn from(r: ItemRecord) -> Self {
        Item {
            id: r.id,
            name: r.name,
            brand: r.brand,
            sku: r.sku,
            kind: r.item_type,
            stock: r.stock,
            total: r.total,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Repository for item rows.
///
/// ## Usage
/// ```rust,ignore
/// let mut conn = pool.acquire().await?;
/// let items = ItemRepository::new(&mut conn).list().await?;
/// ```
pub struct ItemRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ItemRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ItemRepository { conn }
    }

    /// All items in creation order.
    pub async fn list(&mut self) -> DbResult<Vec<Item>> {
        let rows: Vec<ItemRecord> = sqlx::query_as(
            r#"
            SELECT id, name, brand, sku, item_type, stock, total, created_at, updated_at
            FROM items
            ORDER BY created_at, rowid
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        debug!(count = rows.len(), "Listed items");
        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Gets an item by ID.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<Item>> {
        let row: Option<ItemRecord> = sqlx::query_as(
            r#"
            SELECT id, name, brand, sku, item_type, stock, total, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row.map(Item::from))
    }

    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Inserts a new item with every unit available.
    pub async fn insert(&mut self, new: &NewItem) -> DbResult<Item> {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name: new.name.clone(),
            brand: new.brand.clone(),
            sku: new.sku.clone(),
            kind: new.kind.clone(),
            stock: new.total,
            total: new.total,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, sku = %item.sku, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, brand, sku, item_type,
                stock, total, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.sku)
        .bind(&item.kind)
        .bind(item.stock)
        .bind(item.total)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(item)
    }

    /// Writes the mutable fields of an existing item.
    pub async fn update(&mut self, item: &Item) -> DbResult<Item> {
        let now = Utc::now();

        debug!(id = %item.id, stock = item.stock, total = item.total, "Updating item");

        let result = sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                brand = ?3,
                sku = ?4,
                item_type = ?5,
                stock = ?6,
                total = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.sku)
        .bind(&item.kind)
        .bind(item.stock)
        .bind(item.total)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", &item.id));
        }

        Ok(Item {
            updated_at: now,
            ..item.clone()
        })
    }

    pub async fn delete(&mut self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting item");

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }
}
