use axum::{
    Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use db::models::initiative::{CustomerInitiative, Initiative, UpdateInitiative};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::require_admin};

pub fn router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/initiatives/admin", get(list_all))
        .route("/initiatives/delete-all", post(delete_all))
        .route(
            "/initiatives/{id}",
            get(get_one).put(update_one).delete(delete_one),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/initiatives", get(list_visible))
        .merge(admin)
}

/// Public board: visible cards only, summaries surfaced as descriptions.
async fn list_visible(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerInitiative>>, ApiError> {
    let initiatives = Initiative::find_visible(&state.db().pool).await?;
    Ok(Json(initiatives))
}

/// Admin view: every card, hidden ones included.
async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Initiative>>, ApiError> {
    let initiatives = Initiative::find_all(&state.db().pool).await?;
    Ok(Json(initiatives))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Initiative>, ApiError> {
    let initiative = Initiative::find_by_id(&state.db().pool, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(initiative))
}

async fn update_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateInitiative>,
) -> Result<Json<Initiative>, ApiError> {
    let updated = Initiative::update(&state.db().pool, id, &body).await?;
    Ok(Json(updated))
}

async fn delete_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = Initiative::delete(&state.db().pool, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({ "message": "Initiative deleted" })))
}

async fn delete_all(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let deleted = Initiative::delete_all(&state.db().pool).await?;
    info!(deleted, "cleared all initiatives");
    Ok(Json(json!({
        "message": format!("Deleted {deleted} initiatives"),
        "deleted": deleted,
    })))
}
