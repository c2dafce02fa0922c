use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::CatalogItem,
};

use super::AppState;

/// Largest result list a client may ask for
pub const MAX_TOP_N: usize = 50;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// Uploaded file path, image URL or `data:` URI
    pub photo_ref: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub items: Vec<CatalogItem>,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Runs the matching pipeline for one photo and comment
pub async fn find_matches(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<MatchRequest>,
) -> AppResult<Json<MatchResponse>> {
    let top_n = request.top_n.unwrap_or(state.default_top_n);
    if top_n > MAX_TOP_N {
        return Err(AppError::InvalidInput(format!(
            "top_n must be at most {}",
            MAX_TOP_N
        )));
    }

    tracing::info!(
        request_id = %request_id,
        top_n,
        "Processing match request"
    );

    let items = state
        .pipeline
        .find_matches(&request.photo_ref, &request.comment, top_n)
        .await;

    tracing::info!(
        request_id = %request_id,
        results = items.len(),
        "Match request completed"
    );

    Ok(Json(MatchResponse {
        count: items.len(),
        items,
        generated_at: Utc::now(),
    }))
}

/// Looks up a single catalog item
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CatalogItem>> {
    state
        .catalog
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Catalog item {}", id)))
}
