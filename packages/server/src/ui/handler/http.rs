//! HTTP API endpoint handlers (discovery and health).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::domain::StreamId;
use crate::infrastructure::dto::http::{StreamDetailDto, StreamSummaryDto};
use crate::ui::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of streams (discovery)
pub async fn get_streams(State(state): State<Arc<AppState>>) -> Json<Vec<StreamSummaryDto>> {
    let overviews = state.get_streams_usecase.list().await;
    Json(overviews.iter().map(StreamSummaryDto::from).collect())
}

/// Get stream detail by ID
pub async fn get_stream_detail(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> Result<Json<StreamDetailDto>, StatusCode> {
    let stream_id = StreamId::try_from(stream_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    match state.get_streams_usecase.detail(&stream_id).await {
        Some(overview) => Ok(Json(StreamDetailDto::from(&overview))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Debug endpoint to inspect current broadcast state (for testing purposes)
pub async fn debug_stream_state(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let stream_id = StreamId::try_from(stream_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    match state.get_streams_usecase.debug_snapshot(&stream_id).await {
        Some((overview, snapshot)) => Ok(Json(serde_json::json!({
            "overview": overview,
            "snapshot": snapshot,
        }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
