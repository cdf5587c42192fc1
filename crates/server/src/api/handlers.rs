use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use soda_core::{PoolStatus, SanitizedConfig};
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body shared by every API handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Every body rejection (syntax, missing fields, content type) is a 400.
pub fn bad_body(rejection: JsonRejection) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub thumbnails_enabled: bool,
    pub cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_pool: Option<PoolStatus>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        thumbnails_enabled: state.thumbnails().is_enabled(),
        cache_entries: state.cache().len(),
        worker_pool: state.worker_pool().map(|pool| pool.status()),
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
