use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use pdfintake::model::JobRecord;
use pdfintake::status::StatusReport;

use super::{run_blocking, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<ApiResponse<Health>> {
    Json(ApiResponse::ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn task_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<JobRecord> {
    run_blocking(&state, move |service| service.task_status(&job_id)).await
}

/// Where a file currently is in the pipeline. Unknown files answer
/// `not_found` in the body, not with a 404.
pub async fn processing_status(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<StatusReport> {
    run_blocking(&state, move |service| {
        service
            .processing_status(&filename)
            .map(|status| status.into_report(filename))
    })
    .await
}
