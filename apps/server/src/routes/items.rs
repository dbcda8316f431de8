//! `/api/items`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use toolcrib_core::Item;
use toolcrib_ledger::{CreateItem, EditItem};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(edit_item).delete(delete_item),
        )
}

async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.ledger.inventory().list_items().await?))
}

async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Item>> {
    Ok(Json(state.ledger.inventory().get_item(&id).await?))
}

async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<CreateItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let Json(request) = payload?;
    let item = state.ledger.inventory().create_item(request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn edit_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EditItem>, JsonRejection>,
) -> ApiResult<Json<Item>> {
    let Json(request) = payload?;
    Ok(Json(state.ledger.inventory().edit_item(&id, request).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.ledger.inventory().delete_item(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
