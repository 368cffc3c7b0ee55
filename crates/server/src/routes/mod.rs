use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod auth;
pub mod config;
pub mod health;
pub mod initiatives;
pub mod sync;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router())
        .merge(initiatives::router(&state))
        .merge(sync::router(&state))
        .merge(config::router(&state))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
