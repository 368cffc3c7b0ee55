use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::get,
};
use db::models::config::{self, ConfigEntry};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{AppState, error::ApiError, middleware::require_admin};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config).put(put_config))
        .route("/config/ai-models", get(ai_models))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

async fn get_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let entries = ConfigEntry::all(&state.db().pool).await?;
    let map: BTreeMap<String, String> = entries
        .into_iter()
        .map(|e| (e.config_key, e.config_value))
        .collect();
    Ok(Json(json!(map)))
}

#[derive(Debug, Default, Deserialize)]
struct UpdateConfig {
    ai_provider: Option<String>,
    product_name: Option<String>,
    selected_releases: Option<Vec<String>>,
}

/// Partial update; only the supplied keys are written.
async fn put_config(
    State(state): State<AppState>,
    Json(body): Json<UpdateConfig>,
) -> Result<Json<Value>, ApiError> {
    let pool = &state.db().pool;
    if let Some(provider) = &body.ai_provider {
        ConfigEntry::set(pool, config::AI_PROVIDER, provider).await?;
    }
    if let Some(name) = &body.product_name {
        ConfigEntry::set(pool, config::PRODUCT_NAME, name).await?;
    }
    if let Some(releases) = &body.selected_releases {
        ConfigEntry::set_selected_releases(pool, releases).await?;
    }
    info!("admin configuration updated");
    Ok(Json(json!({ "message": "Configuration updated" })))
}

/// Summarization backends with credentials present in the environment.
async fn ai_models(State(state): State<AppState>) -> Json<Value> {
    let models: Vec<&str> = state
        .summarizer()
        .available_backends()
        .into_iter()
        .map(|b| b.id())
        .collect();
    Json(json!({ "models": models }))
}
