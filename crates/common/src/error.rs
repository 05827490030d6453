use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Records store error: {0}")]
    Records(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Scheduling error: {0}")]
    Scheduling(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RelayError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            RelayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            RelayError::Records(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            RelayError::Gateway(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            RelayError::Scheduling(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            RelayError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            RelayError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Gateway(err.to_string())
    }
}
