//! Router configuration for the API server.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::state::AppState;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/model-schema", get(handlers::model_schema))
        // Uploads
        .route("/api/upload-pdf", post(handlers::upload_pdf))
        .route(
            "/api/upload-pdf-to-folder",
            post(handlers::upload_pdf_to_folder),
        )
        // Stored records
        .route("/api/pdfs", get(handlers::list_records))
        .route("/api/database", get(handlers::database_dump))
        .route(
            "/api/pdfs/:filename",
            get(handlers::get_record).put(handlers::update_record),
        )
        .route("/api/commit/:filename", post(handlers::commit_record))
        // Review queue. POST takes a filename, PUT an order id.
        .route("/api/pending", get(handlers::list_pending))
        .route("/api/pending/count", get(handlers::count_pending))
        .route(
            "/api/pending/:key",
            post(handlers::send_to_pending).put(handlers::update_pending),
        )
        .route("/api/pending/:key/commit", post(handlers::commit_pending))
        // Status
        .route("/api/task-status/:job_id", get(handlers::task_status))
        .route(
            "/api/processing-status/:filename",
            get(handlers::processing_status),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pdfintake::{Database, IntakeService, RecordStore};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn record(filename: &str) -> pdfintake::ExtractedRecord {
        serde_json::from_value(serde_json::json!({
            "filename": filename,
            "invoice_number": "INV-1",
            "total_amount": 10.0,
            "content_preview": "Invoice #INV-1",
            "extracted_at": "2024-03-14T12:00:00Z"
        }))
        .unwrap()
    }

    fn setup_test_app() -> (Router, IntakeService, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(Database::open_in_memory().unwrap());
        let service = IntakeService::new(store, dir.path().join("pdfs"));
        let app = create_router(AppState::new(service.clone()));
        (app, service, dir)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_req(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "pdfintake-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _service, _dir) = setup_test_app();
        let (status, json) = send(app, get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_model_schema() {
        let (app, _service, _dir) = setup_test_app();
        let (status, json) = send(app, get_req("/api/model-schema")).await;
        assert_eq!(status, StatusCode::OK);
        let fields = json["data"].as_array().unwrap();
        assert!(fields.iter().any(|f| f["name"] == "invoice_number"));
        let currency = fields.iter().find(|f| f["name"] == "currency").unwrap();
        assert_eq!(currency["default"], "USD");
    }

    #[tokio::test]
    async fn test_list_records_empty() {
        let (app, _service, _dir) = setup_test_app();
        let (status, json) = send(app, get_req("/api/pdfs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_database_lists_records() {
        let (app, service, _dir) = setup_test_app();
        service.store().upsert(&record("a.pdf")).unwrap();
        service.store().upsert(&record("b.pdf")).unwrap();

        let (status, json) = send(app, get_req("/api/database")).await;
        assert_eq!(status, StatusCode::OK);
        let records = json["data"]["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r["filename"] == "a.pdf"));
    }

    #[tokio::test]
    async fn test_get_missing_record_is_404() {
        let (app, _service, _dir) = setup_test_app();
        let (status, json) = send(app, get_req("/api/pdfs/ghost.pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("ghost.pdf"));
    }

    #[tokio::test]
    async fn test_update_record_merges_fields() {
        let (app, service, _dir) = setup_test_app();
        service.store().upsert(&record("a.pdf")).unwrap();

        let (status, json) = send(
            app,
            json_req(
                "PUT",
                "/api/pdfs/a.pdf",
                serde_json::json!({"customer_name": "Jane Doe"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["customer_name"], "Jane Doe");
        assert_eq!(json["data"]["invoice_number"], "INV-1");
    }

    #[tokio::test]
    async fn test_update_record_rejects_unknown_keys() {
        let (app, service, _dir) = setup_test_app();
        service.store().upsert(&record("a.pdf")).unwrap();

        let (status, _json) = send(
            app,
            json_req("PUT", "/api/pdfs/a.pdf", serde_json::json!({"bogus": 1})),
        )
        .await;
        assert!(status.is_client_error());
        assert_eq!(
            service.get_record("a.pdf").unwrap().invoice_number.as_deref(),
            Some("INV-1")
        );
    }

    #[tokio::test]
    async fn test_commit_record() {
        let (app, service, _dir) = setup_test_app();
        service.store().upsert(&record("a.pdf")).unwrap();

        let (status, json) = send(app.clone(), post_req("/api/commit/a.pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["filename"], "a.pdf");

        let (status, _) = send(app, post_req("/api/commit/ghost.pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pending_flow() {
        let (app, service, _dir) = setup_test_app();
        service.store().upsert(&record("a.pdf")).unwrap();

        let (status, json) = send(app.clone(), post_req("/api/pending/a.pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "pending");
        assert_eq!(json["data"]["pdf_data"]["invoice_number"], "INV-1");
        let id = json["data"]["id"].as_i64().unwrap();

        let (_, json) = send(app.clone(), get_req("/api/pending/count")).await;
        assert_eq!(json["data"]["count"], 1);

        let (status, json) = send(
            app.clone(),
            json_req(
                "PUT",
                &format!("/api/pending/{}", id),
                serde_json::json!({"total_amount": 99.5}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["pdf_data"]["total_amount"], 99.5);

        let (status, json) = send(app.clone(), post_req(&format!("/api/pending/{}/commit", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "completed");
        assert_eq!(service.get_record("a.pdf").unwrap().total_amount, Some(99.5));

        let (status, _) = send(app.clone(), post_req(&format!("/api/pending/{}/commit", id))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, json) = send(app, get_req("/api/pending")).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_pending_unknown_targets() {
        let (app, _service, _dir) = setup_test_app();

        let (status, _) = send(app.clone(), post_req("/api/pending/ghost.pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app.clone(),
            json_req("PUT", "/api/pending/404", serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, post_req("/api/pending/404/commit")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_to_folder() {
        let (app, service, _dir) = setup_test_app();

        let (status, json) = send(
            app,
            multipart_req("/api/upload-pdf-to-folder", "scan.pdf", b"%PDF-1.5"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["original_filename"], "scan.pdf");
        let saved = json["data"]["filename"].as_str().unwrap();
        assert!(saved.ends_with("_scan.pdf"));
        assert!(service.watch_directory().join(saved).is_file());
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (app, _service, _dir) = setup_test_app();
        let (status, json) = send(
            app,
            multipart_req("/api/upload-pdf-to-folder", "notes.txt", b"hello"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Only PDF files"));
    }

    #[tokio::test]
    async fn test_upload_without_pool_is_unavailable() {
        let (app, _service, _dir) = setup_test_app();
        let (status, _) = send(app, multipart_req("/api/upload-pdf", "a.pdf", b"%PDF")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_missing_file_field() {
        let (app, _service, _dir) = setup_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload-pdf")
            .header("content-type", "multipart/form-data; boundary=x")
            .body(Body::from("--x--\r\n"))
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_processing_status() {
        let (app, service, _dir) = setup_test_app();

        let (status, json) = send(app.clone(), get_req("/api/processing-status/a.pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "not_found");
        assert_eq!(json["data"]["processed"], false);

        service.store().upsert(&record("a.pdf")).unwrap();
        let (_, json) = send(app, get_req("/api/processing-status/a.pdf")).await;
        assert_eq!(json["data"]["status"], "completed");
        assert_eq!(json["data"]["processed"], true);
        assert_eq!(json["data"]["data"]["invoice_number"], "INV-1");
    }

    #[tokio::test]
    async fn test_task_status_unknown() {
        let (app, _service, _dir) = setup_test_app();
        let (status, _) = send(app, get_req("/api/task-status/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
