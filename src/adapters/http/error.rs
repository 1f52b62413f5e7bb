//! HTTP error rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::application::handlers::order::OrderCommandError;

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// API error type that converts application errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub OrderCommandError);

impl From<OrderCommandError> for ApiError {
    fn from(err: OrderCommandError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for ApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    pub fn forbidden() -> Self {
        Self(OrderCommandError::Forbidden)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(OrderCommandError::InvalidInput(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}
