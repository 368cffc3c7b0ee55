use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Guard for admin-only routes: requires a valid bearer token issued by
/// [`crate::auth::AdminTokenService`]. Missing credentials are 401,
/// invalid or expired ones 403, with the same `{error}` body shape the
/// rest of the API uses.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(token)) => token.token().to_owned(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "No token provided" })),
            )
                .into_response();
        }
    };

    match state.admin_token().verify(&bearer) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(error) => {
            warn!(%error, "rejected admin request");
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    }
}
