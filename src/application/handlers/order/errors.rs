//! Errors for client-facing order commands and queries.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::ports::PaymentError;

/// Errors surfaced to admin and storefront callers.
///
/// Unlike the notification path, these propagate as JSON error bodies.
#[derive(Debug, Clone, Error)]
pub enum OrderCommandError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("No recognized fields supplied")]
    NoFields,

    #[error("Validation failed: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OrderCommandError {
    pub fn code(&self) -> &'static str {
        match self {
            OrderCommandError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            OrderCommandError::NoFields => "NO_FIELDS",
            OrderCommandError::InvalidInput(_) => "VALIDATION_FAILED",
            OrderCommandError::InvalidTransition(_) => "INVALID_STATE_TRANSITION",
            OrderCommandError::Forbidden => "FORBIDDEN",
            OrderCommandError::Provider(_) => "PAYMENT_PROVIDER_ERROR",
            OrderCommandError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderCommandError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            OrderCommandError::NoFields | OrderCommandError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            OrderCommandError::InvalidTransition(_) => StatusCode::CONFLICT,
            OrderCommandError::Forbidden => StatusCode::FORBIDDEN,
            OrderCommandError::Provider(_) => StatusCode::BAD_GATEWAY,
            OrderCommandError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for OrderCommandError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidTransition { .. } => {
                OrderCommandError::InvalidTransition(err.to_string())
            }
            other => OrderCommandError::InvalidInput(other.to_string()),
        }
    }
}

impl From<DomainError> for OrderCommandError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::OrderNotFound => OrderCommandError::OrderNotFound(err.message),
            ErrorCode::NoFields => OrderCommandError::NoFields,
            ErrorCode::ValidationFailed => OrderCommandError::InvalidInput(err.message),
            ErrorCode::InvalidStateTransition => OrderCommandError::InvalidTransition(err.message),
            ErrorCode::Forbidden => OrderCommandError::Forbidden,
            _ => OrderCommandError::Storage(err.to_string()),
        }
    }
}

impl From<PaymentError> for OrderCommandError {
    fn from(err: PaymentError) -> Self {
        OrderCommandError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            OrderCommandError::OrderNotFound("X".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(OrderCommandError::NoFields.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            OrderCommandError::InvalidTransition("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn transition_validation_error_becomes_conflict() {
        let err: OrderCommandError =
            ValidationError::invalid_transition("shipping_status", "delivered", "preparing").into();
        assert_eq!(err.code(), "INVALID_STATE_TRANSITION");
    }

    #[test]
    fn domain_storage_errors_are_internal() {
        let err: OrderCommandError = DomainError::new(ErrorCode::DatabaseError, "down").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
