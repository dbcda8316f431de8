//! `/api/history`

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use toolcrib_core::HistoryEntry;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/history", get(list_history))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// Newest first; `limit` defaults to the configured page size and is
/// clamped by the recorder.
async fn list_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(state.history_limit);
    Ok(Json(state.ledger.history().list_recent(limit).await?))
}
