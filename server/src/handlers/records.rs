use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use pdfintake::model::FieldInfo;
use pdfintake::{ExtractedRecord, RecordUpdate};

use super::{run_blocking, ApiResponse, ApiResult};
use crate::state::AppState;

/// Field descriptors for building edit forms.
pub async fn model_schema(State(state): State<AppState>) -> Json<ApiResponse<&'static [FieldInfo]>> {
    Json(ApiResponse::ok(state.service.model_schema()))
}

pub async fn list_records(State(state): State<AppState>) -> ApiResult<Vec<ExtractedRecord>> {
    run_blocking(&state, |service| service.list_records()).await
}

#[derive(Debug, Serialize)]
pub struct RecordListing {
    pub records: Vec<ExtractedRecord>,
}

/// Every stored record wrapped as `{"records": [...]}`.
pub async fn database_dump(State(state): State<AppState>) -> ApiResult<RecordListing> {
    run_blocking(&state, |service| {
        service
            .list_records()
            .map(|records| RecordListing { records })
    })
    .await
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<ExtractedRecord> {
    run_blocking(&state, move |service| service.get_record(&filename)).await
}

/// Partial update; fields absent from the body keep their stored values.
pub async fn update_record(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(update): Json<RecordUpdate>,
) -> ApiResult<ExtractedRecord> {
    run_blocking(&state, move |service| {
        service.update_record(&filename, &update)
    })
    .await
}

pub async fn commit_record(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<ExtractedRecord> {
    run_blocking(&state, move |service| service.commit_record(&filename)).await
}
