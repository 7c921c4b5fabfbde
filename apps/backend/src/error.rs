//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidCard(#[from] deck_core::ValidationError),

    #[error("bad payload: {0}")]
    BadPayload(String),

    #[error("packaging failed: {0}")]
    Packaging(#[from] deck_core::PackagingError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::InvalidCard(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_card"),
            ApiError::BadPayload(_) => (StatusCode::BAD_REQUEST, "bad_payload"),
            ApiError::Packaging(_) => (StatusCode::INTERNAL_SERVER_ERROR, "packaging_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
