use axum::extract::{Multipart, State};
use serde::Serialize;

use pdfintake::service::SavedUpload;

use super::{run_blocking, ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub job_id: String,
    pub filename: String,
    pub message: &'static str,
}

/// Pulls the `file` part out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(ApiError::bad_request("Missing 'file' field"))
}

/// Queues an uploaded PDF for extraction and returns its job id.
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<UploadAccepted> {
    let (filename, bytes) = read_file_field(multipart).await?;
    run_blocking(&state, move |service| {
        service
            .submit_upload(bytes, &filename)
            .map(|handle| UploadAccepted {
                job_id: handle.job_id,
                filename: handle.filename,
                message: "PDF queued for processing",
            })
    })
    .await
}

/// Saves an uploaded PDF into the watch folder for the watcher to pick up.
pub async fn upload_pdf_to_folder(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<SavedUpload> {
    let (filename, bytes) = read_file_field(multipart).await?;
    run_blocking(&state, move |service| service.save_to_folder(&bytes, &filename)).await
}
