//! `/api/loans`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use toolcrib_core::{Loan, LoanStatus};
use toolcrib_ledger::CreateLoan;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/{id}", get(get_loan))
        .route("/loans/{id}/return", put(return_loan))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    /// `active` or `returned`; blank means both.
    pub status: Option<String>,
}

async fn list_loans(
    State(state): State<AppState>,
    query: Result<Query<LoanQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Loan>>> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<LoanStatus>)
        .transpose()?;
    Ok(Json(state.ledger.loans().list_loans(status).await?))
}

async fn get_loan(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Loan>> {
    Ok(Json(state.ledger.loans().get_loan(&id).await?))
}

async fn create_loan(
    State(state): State<AppState>,
    payload: Result<Json<CreateLoan>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Loan>)> {
    let Json(request) = payload?;
    let loan = state.ledger.loans().create_loan(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

async fn return_loan(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Loan>> {
    Ok(Json(state.ledger.loans().return_loan(&id).await?))
}
