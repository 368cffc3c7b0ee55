use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use services::services::{aha::AhaError, sync::SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Aha(#[from] AhaError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Initiative not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("{0}")]
    Configuration(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound | ApiError::Database(sqlx::Error::RowNotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::BadRequest(_) | ApiError::Sync(SyncError::NoSyncInProgress) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Sync(SyncError::AlreadyInProgress) => StatusCode::CONFLICT,
            ApiError::Database(_)
            | ApiError::Aha(_)
            | ApiError::Sync(_)
            | ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
