//! Payment provider port.
//!
//! Read access to authoritative payment and merchant-order state, plus
//! preference creation for checkout. Calls cross the network and may be
//! slow, rate limited or fail; callers decide what a failure means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the payment provider API.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch a payment by id.
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError>;

    /// Fetch a merchant order by id.
    async fn get_merchant_order(
        &self,
        merchant_order_id: &str,
    ) -> Result<MerchantOrderRecord, PaymentError>;

    /// Most recent merchant order carrying an external reference, if any.
    async fn find_merchant_order_by_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<MerchantOrderRecord>, PaymentError>;

    /// Create a checkout preference.
    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<Preference, PaymentError>;
}

/// Payment as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    /// Raw provider status; mapped by the domain.
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub preference_id: Option<String>,
    /// Parent merchant order, when the payment belongs to one.
    pub merchant_order_id: Option<String>,
    pub transaction_amount: Option<f64>,
    pub currency_id: Option<String>,
}

/// Merchant order as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantOrderRecord {
    pub id: String,
    pub preference_id: Option<String>,
    pub external_reference: Option<String>,
    pub payments: Vec<MerchantOrderPayment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantOrderPayment {
    pub id: String,
    pub status: Option<String>,
}

/// Request to create a checkout preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRequest {
    /// Value the provider echoes back on payments; the order id.
    pub external_reference: String,
    pub items: Vec<PreferenceItem>,
    pub payer_email: Option<String>,
    pub notification_url: Option<String>,
    pub back_urls: Option<BackUrls>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceItem {
    pub id: Option<String>,
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// Created preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    /// Checkout redirect URL.
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
}

/// Error from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// HTTP status returned by the provider, when there was a response.
    pub http_status: Option<u16>,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    pub fn not_configured() -> Self {
        Self::new(
            PaymentErrorCode::NotConfigured,
            "MP_ACCESS_TOKEN is not configured",
        )
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} {} not found", resource, id))
    }

    pub fn invalid_id(resource: &str, id: &str) -> Self {
        Self::new(PaymentErrorCode::InvalidId, format!("{} id {:?} is not numeric", resource, id))
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    Timeout,
    /// Credential rejected by the provider.
    AuthenticationError,
    NotFound,
    RateLimitExceeded,
    /// No credential configured locally.
    NotConfigured,
    /// Identifier rejected before any request was sent.
    InvalidId,
    /// Response could not be decoded.
    InvalidResponse,
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::NotConfigured => "not_configured",
            PaymentErrorCode::InvalidId => "invalid_id",
            PaymentErrorCode::InvalidResponse => "invalid_response",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
