//! HTTP request handlers.

mod pending;
mod records;
mod status;
mod uploads;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pdfintake::{IntakeError, IntakeService, WorkerError};

use crate::state::AppState;

pub use pending::{commit_pending, count_pending, list_pending, send_to_pending, update_pending};
pub use records::{
    commit_record, database_dump, get_record, list_records, model_schema, update_record,
};
pub use status::{health, processing_status, task_status};
pub use uploads::{upload_pdf, upload_pdf_to_folder};

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// An error rendered as an `ApiResponse` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

fn status_for(error: &IntakeError) -> StatusCode {
    if error.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match error {
        IntakeError::InvalidTransition { .. } => StatusCode::CONFLICT,
        IntakeError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
        IntakeError::Worker(WorkerError::ChannelClosed) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<IntakeError> for ApiError {
    fn from(error: IntakeError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            log::error!("Request failed: {}", error);
        }
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Runs a service call on the blocking pool; every service call may wait on
/// the database lock.
pub(crate) async fn run_blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&IntakeService) -> pdfintake::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::internal(format!("Task failed: {}", e)))?;
    Ok(Json(ApiResponse::ok(result?)))
}
