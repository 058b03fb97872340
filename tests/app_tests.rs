use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use guesthouse::app::{AppState, router};
use guesthouse::config::Config;
use guesthouse::error::{AppError, AppResult};
use guesthouse::record::FieldSchema;
use guesthouse::sheets::{MemorySheets, SheetBackend};
use guesthouse::store::GuestStore;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "guesthouse-test-boundary";

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn app_with(backend: Arc<dyn SheetBackend>) -> Router {
    let config = Config::default();
    let store = GuestStore::new(backend, &config.guests_tab, FieldSchema::default());
    router(Arc::new(AppState::new(config, store)))
}

fn app() -> Router {
    app_with(Arc::new(MemorySheets::new()))
}

fn multipart(uri: &str, field: &str, file_name: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Backend whose every call fails the way an unreachable API does
struct UnreachableSheets;

#[async_trait]
impl SheetBackend for UnreachableSheets {
    async fn read_rows(&self, _tab: &str) -> AppResult<Vec<Vec<String>>> {
        Err(AppError::Upstream("connection refused".into()))
    }

    async fn update_row(&self, _tab: &str, _row: usize, _values: Vec<String>) -> AppResult<()> {
        Err(AppError::Upstream("connection refused".into()))
    }

    async fn append_rows(&self, _tab: &str, _rows: Vec<Vec<String>>) -> AppResult<()> {
        Err(AppError::Upstream("connection refused".into()))
    }

    async fn tab_titles(&self) -> AppResult<Vec<String>> {
        Err(AppError::Upstream("connection refused".into()))
    }

    async fn add_tab(&self, _tab: &str) -> AppResult<()> {
        Err(AppError::Upstream("connection refused".into()))
    }
}

#[tokio::test]
async fn health_check() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn import_then_reimport() {
    let app = app();
    let export = fixture("airbnb_export.csv");

    let (status, body) =
        send_json(&app, multipart("/api/import", "file", "airbnb.csv", &export)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["source"], json!("airbnb"));
    assert_eq!(body["totalProcessed"], json!(2));
    assert_eq!(body["results"]["added"], json!(2));
    assert_eq!(body["detectedHeaders"][0], json!("Confirmation code"));

    let (_, body) = send_json(&app, multipart("/api/import", "file", "airbnb.csv", &export)).await;
    assert_eq!(body["results"]["added"], json!(0));
    assert_eq!(body["results"]["unchanged"], json!(2));
}

#[tokio::test]
async fn import_rejects_bad_uploads() {
    let app = app();

    let (status, body) =
        send_json(&app, multipart("/api/import", "file", "notes.pdf", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, body) = send_json(
        &app,
        multipart("/api/import", "file", "guests.csv", b"Name,Room\nAna,Bliss\n"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detectedHeaders"], json!(["Name", "Room"]));

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/import")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(format!("--{BOUNDARY}--\r\n")))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guest_crud_round() {
    let app = app();

    let (status, created) = send_json(
        &app,
        json_request(
            "POST",
            "/api/guests",
            json!({ "booking_id": "D-1", "first_name": "ana", "adults": "2", "nights": "3" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["source"], json!("Direct"));

    let (status, _) = send_json(
        &app,
        json_request("POST", "/api/guests", json!({ "booking_id": "D-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, patched) = send_json(
        &app,
        json_request("PATCH", "/api/guests/D-1", json!({ "notes": "window seat" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["notes"], json!("window seat"));

    let (status, _) = send_json(
        &app,
        json_request("PATCH", "/api/guests/NOPE", json!({ "notes": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send_json(&app, get("/api/guests")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["booking_id"], json!("D-1"));
    assert_eq!(list[0]["notes"], json!("window seat"));
    assert_eq!(list[0]["city_tax_due"], json!("15.00"));
}

#[tokio::test]
async fn export_formats() {
    let app = app();
    send(
        &app,
        multipart("/api/import", "file", "booking.csv", &fixture("booking_export.csv")),
    )
    .await;

    let response = app
        .clone()
        .oneshot(get("/api/guests/export?format=csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("booking_id,first_name,last_name"));
    assert_eq!(text.lines().count(), 3);

    let (status, body) = send(&app, get("/api/guests/export?format=xlsx")).await;
    assert_eq!(status, StatusCode::OK);
    // xlsx is a zip container
    assert_eq!(&body[..2], b"PK");

    let (status, _) = send(&app, get("/api/guests/export?format=pdf")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_insights_endpoint() {
    let (status, body) = send_json(
        &app(),
        multipart("/api/insights/reviews", "file", "reviews.csv", &fixture("reviews.csv")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalReviews"], json!(4));
    assert_eq!(body["issues"][0]["issue"], json!("noise"));
}

#[tokio::test]
async fn upstream_failure_is_a_server_error() {
    let app = app_with(Arc::new(UnreachableSheets));

    let (status, body) = send_json(&app, get("/api/guests")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}
