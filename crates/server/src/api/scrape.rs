//! Directory listing API handler.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use soda_core::{Contents, ScrapeError, ScrapeRequest};
use tracing::warn;

use super::handlers::{api_error, bad_body, ApiError};
use crate::state::AppState;

/// POST /api/scrape
///
/// List the folders and files of a remote HTTP directory index.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<Contents>, ApiError> {
    let Json(request) = payload.map_err(bad_body)?;

    match state.scraper().scrape(&request).await {
        Ok(contents) => Ok(Json(contents)),
        Err(e @ ScrapeError::InvalidUrl(_)) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            warn!("Scraping {} failed: {}", request.url, e);
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}
