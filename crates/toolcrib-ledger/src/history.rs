//! # History Recorder
//!
//! Append-only audit log. Writes always join the caller's transaction so a
//! rolled-back mutation leaves no orphan entry; reads are bounded and newest
//! first.

use std::sync::Arc;

use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use toolcrib_core::validation::clamp_history_limit;
use toolcrib_core::{HistoryAction, HistoryEntry, Item, Loan, NewHistoryEntry};
use toolcrib_db::{LedgerStore, StoreTx};

/// Read side of the history, plus the in-transaction append used by the
/// inventory ledger and loan engine.
#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn LedgerStore>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        HistoryRecorder { store }
    }

    /// Appends one entry inside `tx`.
    pub async fn record(
        tx: &mut dyn StoreTx,
        action: HistoryAction,
        description: String,
    ) -> LedgerResult<HistoryEntry> {
        debug!(action = action.label(), %description, "Recording history");
        let entry = tx
            .append_history(&NewHistoryEntry::new(action, description))
            .await?;
        Ok(entry)
    }

    /// The most recent entries, newest first. `limit` is clamped to `1..=100`.
    pub async fn list_recent(&self, limit: u32) -> LedgerResult<Vec<HistoryEntry>> {
        let limit = clamp_history_limit(limit);
        self.store
            .list_history(limit)
            .await
            .map_err(LedgerError::from)
    }
}

// =============================================================================
// Descriptions
// =============================================================================

pub(crate) fn describe_created(item: &Item) -> String {
    format!("{} ({}): {} unit(s)", item.name, item.sku, item.total)
}

pub(crate) fn describe_deleted(item: &Item) -> String {
    format!("{} ({})", item.name, item.sku)
}

pub(crate) fn describe_edited(before: &Item, after: &Item) -> String {
    let mut text = format!(
        "{} ({}): total {} → {}, stock {} → {}",
        after.name, after.sku, before.total, after.total, before.stock, after.stock
    );
    if before.name != after.name {
        text.push_str(&format!(", renamed from {}", before.name));
    }
    text
}

/// "Ana: 3 unit(s) of Drill, Saw (Taller 2)"
pub(crate) fn describe_loan(loan: &Loan) -> String {
    let mut names: Vec<&str> = Vec::new();
    for line in &loan.lines {
        if !names.contains(&line.name_snapshot.as_str()) {
            names.push(&line.name_snapshot);
        }
    }

    let mut text = format!(
        "{}: {} unit(s) of {}",
        loan.responsible,
        loan.total_units(),
        names.join(", ")
    );
    if !loan.location.is_empty() {
        text.push_str(&format!(" ({})", loan.location));
    }
    text
}
