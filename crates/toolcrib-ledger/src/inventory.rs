//! # Inventory Ledger
//!
//! Creates, edits and deletes items, and owns the stock-adjust primitive the
//! loan engine uses inside its own transactions.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request ──► validate (no I/O) ──► begin ──► read item ──► rule check  │
//! │                    │                                         │          │
//! │                    ▼ Err                                     ▼ Err      │
//! │               Validation                         drop(tx) → rollback    │
//! │                                                              │          │
//! │                                  write item + append history │          │
//! │                                                              ▼          │
//! │                                     commit ──► announce(inventory,      │
//! │                                                         history)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};
use ts_rs::TS;

use crate::commit;
use crate::error::{log_rejection, LedgerError, LedgerResult};
use crate::history::{describe_created, describe_deleted, describe_edited, HistoryRecorder};
use crate::notifier::{announce_all, ChangeNotifier};
use toolcrib_core::validation::{validate_item_name, validate_label, validate_sku, validate_units};
use toolcrib_core::{generate_sku, HistoryAction, Item, NewItem, Topic};
use toolcrib_db::{LedgerStore, StoreTx};

/// Topics announced after an item mutation commits.
const ITEM_TOPICS: [Topic; 2] = [Topic::InventoryChanged, Topic::HistoryChanged];

// =============================================================================
// Requests
// =============================================================================

/// Payload of `CreateItem`.
///
/// ```json
/// { "name": "Hammer", "brand": "Stanley", "type": "Hand tool", "stock": 4 }
/// ```
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    /// Generated from the name when absent or blank.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Initial units; the item starts with `stock == total == stock`.
    #[serde(default)]
    pub stock: i64,
}

/// Payload of `EditItem`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EditItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    /// Keeps the current SKU when absent or blank.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub total: i64,
}

/// Trims and validates an optional SKU; `None` when blank.
fn given_sku(sku: Option<&str>) -> LedgerResult<Option<String>> {
    match sku.map(str::trim) {
        Some(sku) if !sku.is_empty() => {
            validate_sku(sku)?;
            Ok(Some(sku.to_string()))
        }
        _ => Ok(None),
    }
}

// =============================================================================
// Inventory Ledger
// =============================================================================

#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        InventoryLedger { store, notifier }
    }

    /// All items in creation order.
    pub async fn list_items(&self) -> LedgerResult<Vec<Item>> {
        let items = self.store.list_items().await?;
        debug!(count = items.len(), "Listed items");
        Ok(items)
    }

    pub async fn get_item(&self, id: &str) -> LedgerResult<Item> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| LedgerError::item_not_found(id))
    }

    /// Creates an item with every unit available and records "Created".
    pub async fn create_item(&self, request: CreateItem) -> LedgerResult<Item> {
        let result = self.try_create_item(request).await;
        match &result {
            Ok(item) => {
                info!(id = %item.id, sku = %item.sku, total = item.total, "Item created");
                announce_all(self.notifier.as_ref(), &ITEM_TOPICS);
            }
            Err(e) => log_rejection("create_item", e),
        }
        result
    }

    async fn try_create_item(&self, request: CreateItem) -> LedgerResult<Item> {
        let name = request.name.trim();
        validate_item_name(name)?;
        validate_label("brand", &request.brand)?;
        validate_label("type", &request.kind)?;
        validate_units("stock", request.stock)?;

        let sku = match given_sku(request.sku.as_deref())? {
            Some(sku) => sku,
            None => generate_sku(name),
        };

        let new_item = NewItem {
            name: name.to_string(),
            brand: request.brand.trim().to_string(),
            sku,
            kind: request.kind.trim().to_string(),
            total: request.stock,
        };

        let mut tx = self.store.begin().await?;
        let item = tx.insert_item(&new_item).await?;
        item.check_invariant()?;
        HistoryRecorder::record(tx.as_mut(), HistoryAction::Created, describe_created(&item))
            .await?;
        commit(tx).await?;

        Ok(item)
    }

    /// Renames/relabels an item and moves its total, shifting stock by the
    /// same delta. Records "Edited" with before/after totals.
    pub async fn edit_item(&self, id: &str, request: EditItem) -> LedgerResult<Item> {
        let result = self.try_edit_item(id, request).await;
        match &result {
            Ok(item) => {
                info!(id = %item.id, stock = item.stock, total = item.total, "Item edited");
                announce_all(self.notifier.as_ref(), &ITEM_TOPICS);
            }
            Err(e) => log_rejection("edit_item", e),
        }
        result
    }

    async fn try_edit_item(&self, id: &str, request: EditItem) -> LedgerResult<Item> {
        let name = request.name.trim();
        validate_item_name(name)?;
        validate_label("brand", &request.brand)?;
        validate_label("type", &request.kind)?;
        validate_units("total", request.total)?;
        let sku = given_sku(request.sku.as_deref())?;

        let mut tx = self.store.begin().await?;
        let before = tx
            .get_item(id)
            .await?
            .ok_or_else(|| LedgerError::item_not_found(id))?;

        let mut after = before.with_total(request.total)?;
        after.name = name.to_string();
        after.brand = request.brand.trim().to_string();
        after.kind = request.kind.trim().to_string();
        if let Some(sku) = sku {
            after.sku = sku;
        }

        let after = tx.update_item(&after).await?;
        HistoryRecorder::record(
            tx.as_mut(),
            HistoryAction::Edited,
            describe_edited(&before, &after),
        )
        .await?;
        commit(tx).await?;

        Ok(after)
    }

    /// Deletes an item that has every unit on the shelf. Records "Deleted".
    pub async fn delete_item(&self, id: &str) -> LedgerResult<Item> {
        let result = self.try_delete_item(id).await;
        match &result {
            Ok(item) => {
                info!(id = %item.id, sku = %item.sku, "Item deleted");
                announce_all(self.notifier.as_ref(), &ITEM_TOPICS);
            }
            Err(e) => log_rejection("delete_item", e),
        }
        result
    }

    async fn try_delete_item(&self, id: &str) -> LedgerResult<Item> {
        let mut tx = self.store.begin().await?;
        let item = tx
            .get_item(id)
            .await?
            .ok_or_else(|| LedgerError::item_not_found(id))?;

        item.ensure_deletable()?;

        tx.delete_item(id).await?;
        HistoryRecorder::record(tx.as_mut(), HistoryAction::Deleted, describe_deleted(&item))
            .await?;
        commit(tx).await?;

        Ok(item)
    }

    /// Shifts an item's stock by `delta` inside `tx`.
    ///
    /// ## Stock Adjust
    /// ```text
    /// delta < 0   checkout   fails with InsufficientStock below 0
    /// delta > 0   return     fails with StockOverflow above total
    /// ```
    ///
    /// The caller owns the transaction; on error it must drop it.
    pub async fn adjust_stock(tx: &mut dyn StoreTx, item_id: &str, delta: i64) -> LedgerResult<Item> {
        let item = tx
            .get_item(item_id)
            .await?
            .ok_or_else(|| LedgerError::item_not_found(item_id))?;

        let adjusted = item.with_stock_delta(delta)?;
        debug!(id = %item_id, from = item.stock, to = adjusted.stock, "Adjusting stock");
        Ok(tx.update_item(&adjusted).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
