use axum::{
    Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use db::models::sync_log::SyncLog;
use serde::Deserialize;
use serde_json::{Value, json};
use services::services::{aha::ReleaseSummary, sync::SyncProgress};

use crate::{AppState, error::ApiError, middleware::require_admin};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/sync/refresh", post(refresh))
        .route("/sync/progress", get(progress))
        .route("/sync/cancel", post(cancel))
        .route("/sync/history", get(history))
        .route("/sync/releases", get(releases))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Kick off a background sync; progress is polled separately.
async fn refresh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.sync().start()?;
    Ok(Json(json!({ "message": "Sync started", "inProgress": true })))
}

async fn progress(State(state): State<AppState>) -> Json<SyncProgress> {
    Json(state.sync().progress())
}

async fn cancel(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.sync().cancel()?;
    Ok(Json(json!({ "message": "Cancellation requested" })))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SyncLog>>, ApiError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let logs = SyncLog::find_recent(&state.db().pool, limit).await?;
    Ok(Json(logs))
}

/// Current and future releases available for selection.
async fn releases(State(state): State<AppState>) -> Result<Json<Vec<ReleaseSummary>>, ApiError> {
    let releases = state.aha().list_releases().await?;
    Ok(Json(releases))
}
