//! Payment configuration (Mercado Pago)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Mercado Pago credentials and webhook settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Provider API credential (`MP_ACCESS_TOKEN`)
    #[serde(default)]
    pub access_token: String,

    /// HMAC secret for webhook signatures; verification is skipped when unset
    pub webhook_secret: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for a single provider call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Public base URL used to build notification and back URLs for preferences
    pub public_url: Option<String>,
}

impl PaymentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether provider calls can be made at all
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn is_sandbox(&self) -> bool {
        self.access_token.starts_with("TEST-")
    }

    /// Validate payment configuration
    ///
    /// A missing access token is allowed: lookups then fail with a
    /// not-configured error and webhooks become no-ops.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidApiBaseUrl);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            webhook_secret: None,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            public_url: None,
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
