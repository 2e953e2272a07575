//! Unified error handling for the server.

use crate::sync::SyncError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Engine error: {0}")]
    Engine(#[from] sdbsync_engine::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::Sync(SyncError::Validation(e))
            | AppError::Engine(sdbsync_engine::Error::Validation(e)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                e.to_string(),
                serde_json::to_value(e).ok(),
            ),
            AppError::Sync(SyncError::Store(e)) => {
                tracing::error!("Store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Store error".to_string(),
                    None,
                )
            }
            AppError::Sync(SyncError::NotFound(msg)) | AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, format!("Not found: {msg}"), None)
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use sdbsync_engine::{ValidationError, Violation, ViolationCode};

    #[test]
    fn status_codes() {
        let validation = AppError::from(SyncError::from(ValidationError::new(vec![
            Violation::new("age", ViolationCode::OutOfRange),
        ])));
        assert_eq!(validation.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let store = AppError::from(SyncError::from(StoreError::InvalidToken));
        assert_eq!(store.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let missing = AppError::from(SyncError::NotFound("Clients/x".into()));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let engine = AppError::from(sdbsync_engine::Error::IdentifierUnset("id".into()));
        assert_eq!(engine.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
