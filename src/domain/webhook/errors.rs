//! Error taxonomy for inbound payment notifications.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur while accepting or reconciling a notification.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Signature header missing, malformed or not matching the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No payment or merchant-order id could be extracted.
    #[error("Notification carries no id")]
    MissingId,

    /// The provider lookup failed or timed out.
    #[error("Lookup failed for {topic} {id}: {reason}")]
    LookupFailure {
        topic: String,
        id: String,
        reason: String,
    },

    /// Body could not be read as JSON or form data.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The order store rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::MissingId => "MISSING_ID",
            WebhookError::LookupFailure { .. } => "LOOKUP_FAILURE",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True when a later redelivery of the same notification could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::LookupFailure { .. } | WebhookError::Storage(_)
        )
    }

    /// Status for callers that surface the error directly. The webhook
    /// routes themselves always acknowledge with 200.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MissingId
            | WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::LookupFailure { .. } => StatusCode::BAD_GATEWAY,
            WebhookError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}
