//! Thumbnail API handler.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::Serialize;
use soda_core::{RpcError, ThumbnailRequest};
use tracing::warn;

use super::handlers::{api_error, bad_body, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ThumbnailResponse {
    /// Hosted image URL; empty when the worker could not produce one.
    pub thumbnail: String,
}

/// POST /api/thumbnail
///
/// Resolve a video URL to a hosted thumbnail, blocking until a worker answers
/// or the deadline passes.
pub async fn create_thumbnail(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ThumbnailRequest>, JsonRejection>,
) -> Result<Json<ThumbnailResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_body)?;

    if request.url.trim().is_empty() || request.filename.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "url and filename are required",
        ));
    }

    match state.thumbnails().dispatch(&request).await {
        Ok(thumbnail) => Ok(Json(ThumbnailResponse { thumbnail })),
        Err(e) => {
            let status = match &e {
                RpcError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
                RpcError::UnsupportedFormat { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RpcError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RpcError::Broker(_) => StatusCode::BAD_GATEWAY,
                RpcError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                warn!("Thumbnail for {} failed: {}", request.key(), e);
            }
            Err(api_error(status, e.to_string()))
        }
    }
}
