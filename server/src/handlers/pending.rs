use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use pdfintake::{PendingOrder, RecordUpdate};

use super::{run_blocking, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub count: u64,
}

/// Copies a stored record into the review queue.
pub async fn send_to_pending(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<PendingOrder> {
    run_blocking(&state, move |service| service.send_to_pending(&filename)).await
}

pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Vec<PendingOrder>> {
    run_blocking(&state, |service| service.list_pending()).await
}

pub async fn count_pending(State(state): State<AppState>) -> ApiResult<PendingCount> {
    run_blocking(&state, |service| {
        service.count_pending().map(|count| PendingCount { count })
    })
    .await
}

pub async fn update_pending(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<RecordUpdate>,
) -> ApiResult<PendingOrder> {
    run_blocking(&state, move |service| service.update_pending(id, &update)).await
}

/// Writes the reviewed snapshot back to the store.
pub async fn commit_pending(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PendingOrder> {
    run_blocking(&state, move |service| service.commit_pending(id)).await
}
