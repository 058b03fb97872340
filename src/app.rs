#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::downloader::{ExportFormat, export};
use crate::error::{AppError, AppResult};
use crate::guests::GuestRegistry;
use crate::import::{ImportMode, run_import};
use crate::insights::analyze_upload;
use crate::record::{FieldSchema, GuestRecord, timestamp};
use crate::store::GuestStore;

/// Multipart field carrying the uploaded export
const FILE_FIELD: &str = "file";

pub struct AppState {
    pub config: Config,
    pub registry: GuestRegistry,
}

impl AppState {
    pub fn new(config: Config, store: GuestStore) -> Self {
        let registry = GuestRegistry::new(
            store,
            config.policy.duplicates,
            config.city_tax_per_night,
        );
        AppState { config, registry }
    }

    pub fn from_config(config: Config) -> Self {
        let store = GuestStore::new(config.backend(), &config.guests_tab, FieldSchema::default());
        Self::new(config, store)
    }
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

/// Build the router; split from `run` so tests can drive it directly
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/import", post(import_bookings))
        .route("/api/guests", get(list_guests).post(create_guest))
        .route("/api/guests/export", get(export_guests))
        .route("/api/guests/:booking_id", patch(patch_guest))
        .route("/api/insights/reviews", post(review_insights))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    // Start server
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Pull the uploaded file (name and bytes) out of a multipart body
async fn read_upload(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        let is_file = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;

        if file_name.is_empty() {
            return Err(AppError::BadRequest("Uploaded file has no name".to_string()));
        }
        return Ok((file_name, bytes.to_vec()));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

async fn import_bookings(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Response> {
    let (file_name, bytes) = read_upload(multipart).await?;
    let report = run_import(
        state.registry.store(),
        state.config.policy,
        &file_name,
        &bytes,
        ImportMode::Apply,
        &timestamp(Utc::now()),
    )
    .await?;

    Ok(Json(report).into_response())
}

async fn list_guests(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let guests = state.registry.list().await?;
    Ok(Json(guests).into_response())
}

async fn create_guest(
    State(state): State<Arc<AppState>>,
    Json(input): Json<GuestRecord>,
) -> AppResult<Response> {
    let record = state.registry.create(input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn patch_guest(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> AppResult<Response> {
    let record = state
        .registry
        .patch(&booking_id, &fields, Utc::now())
        .await?;
    Ok(Json(record).into_response())
}

async fn export_guests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> AppResult<Response> {
    let raw_format = params.format.unwrap_or_else(|| "csv".to_string());
    let format = ExportFormat::parse(&raw_format)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported export format: {}", raw_format)))?;

    let records = state.registry.records().await?;
    let bytes = export(format, state.registry.store().schema(), &records)?;

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn review_insights(multipart: Multipart) -> AppResult<Response> {
    let (file_name, bytes) = read_upload(multipart).await?;
    let insights = analyze_upload(&file_name, &bytes)?;
    Ok(Json(insights).into_response())
}
