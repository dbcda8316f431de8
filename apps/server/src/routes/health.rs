//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::state::AppState;

/// `200 OK` when the store answers a query, `503` otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.ledger.health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable")
    }
}
