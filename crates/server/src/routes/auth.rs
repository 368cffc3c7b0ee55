use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{AppState, auth::verify_password, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    password: String,
}

/// Exchange the admin password for a bearer token.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let Some(configured) = state.config().admin_password.as_ref() else {
        return Err(ApiError::Configuration(
            "Admin password is not configured".to_string(),
        ));
    };

    if !verify_password(&body.password, configured) {
        warn!("admin login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let (token, expires_in) = state
        .admin_token()
        .generate()
        .map_err(|e| ApiError::Configuration(format!("failed to issue token: {e}")))?;

    info!("admin login succeeded");
    Ok(Json(json!({ "token": token, "expiresIn": expires_in })).into_response())
}

/// Report whether the presented bearer token is still valid. Unlike the
/// admin guard this never rejects the request outright, so the frontend
/// can poll it to decide when to re-login.
async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "No token provided" })),
        )
            .into_response();
    };

    match state.admin_token().verify(bearer.token()) {
        Ok(claims) => Json(json!({ "valid": true, "user": claims })).into_response(),
        Err(error) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}
