//! Mercado Pago REST client.
//!
//! Implements `PaymentProvider` against the public API with a bearer
//! access token. Every call is bounded by the configured timeout; a
//! missing token short-circuits to `NotConfigured` without touching the
//! network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::PaymentConfig;
use crate::ports::{
    MerchantOrderRecord, PaymentError, PaymentErrorCode, PaymentProvider, PaymentRecord,
    Preference, PreferenceRequest,
};

use super::api_types::{
    MpErrorBody, MpMerchantOrder, MpMerchantOrderSearch, MpPayment, MpPreference,
    MpPreferenceBody,
};

/// Connection settings for [`MercadoPagoClient`].
#[derive(Clone)]
pub struct MercadoPagoSettings {
    access_token: SecretString,
    base_url: String,
    timeout: Duration,
}

impl MercadoPagoSettings {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            base_url: "https://api.mercadopago.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.access_token.clone())
            .with_base_url(config.api_base_url.clone())
            .with_timeout(config.request_timeout())
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn is_configured(&self) -> bool {
        !self.access_token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for MercadoPagoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MercadoPagoSettings")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Mercado Pago payment provider.
pub struct MercadoPagoClient {
    settings: MercadoPagoSettings,
    http: Client,
}

impl MercadoPagoClient {
    pub fn new(settings: MercadoPagoSettings) -> Result<Self, PaymentError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { settings, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    /// Path segment for a provider id; ids are numeric.
    fn id_segment<'a>(resource: &str, id: &'a str) -> Result<&'a str, PaymentError> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentError::invalid_id(resource, id));
        }
        Ok(id)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, PaymentError> {
        if !self.settings.is_configured() {
            return Err(PaymentError::not_configured());
        }
        Ok(builder.bearer_auth(self.settings.access_token.expose_secret()))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, PaymentError> {
        self.authorized(builder)?.send().await.map_err(|e| {
            if e.is_timeout() {
                PaymentError::timeout(format!(
                    "No response within {}s",
                    self.settings.timeout.as_secs()
                ))
            } else if e.is_connect() {
                PaymentError::network(format!("Connection failed: {}", e))
            } else {
                PaymentError::network(e.to_string())
            }
        })
    }

    /// Map a response to a decoded body or a typed provider error.
    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        resource: &str,
        id: &str,
    ) -> Result<T, PaymentError> {
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                PaymentError::invalid_response(format!("Cannot decode {}: {}", resource, e))
                    .with_http_status(status.as_u16())
            });
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<MpErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or(body);

        let err = match status.as_u16() {
            401 | 403 => PaymentError::new(PaymentErrorCode::AuthenticationError, detail),
            404 => PaymentError::not_found(resource, id),
            429 => PaymentError::new(PaymentErrorCode::RateLimitExceeded, detail),
            _ => PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("{} lookup failed: {}", resource, detail),
            ),
        };
        Err(err.with_http_status(status.as_u16()))
    }
}

#[async_trait]
impl PaymentProvider for MercadoPagoClient {
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        let id = Self::id_segment("payment", payment_id)?;
        let request = self.http.get(self.url(&format!("/v1/payments/{}", id)));
        let response = self.send(request).await?;
        let payment: MpPayment = self.decode(response, "payment", payment_id).await?;

        tracing::debug!(
            payment_id = %payment.id,
            status = payment.status.as_deref().unwrap_or("-"),
            "Fetched payment"
        );
        Ok(payment.into())
    }

    async fn get_merchant_order(
        &self,
        merchant_order_id: &str,
    ) -> Result<MerchantOrderRecord, PaymentError> {
        let id = Self::id_segment("merchant_order", merchant_order_id)?;
        let request = self.http.get(self.url(&format!("/merchant_orders/{}", id)));
        let response = self.send(request).await?;
        let order: MpMerchantOrder = self
            .decode(response, "merchant_order", merchant_order_id)
            .await?;

        tracing::debug!(
            merchant_order_id = %order.id,
            payments = order.payments.len(),
            "Fetched merchant order"
        );
        Ok(order.into())
    }

    async fn find_merchant_order_by_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<MerchantOrderRecord>, PaymentError> {
        let request = self
            .http
            .get(self.url("/merchant_orders/search"))
            .query(&[("external_reference", external_reference)]);
        let response = self.send(request).await?;
        let search: MpMerchantOrderSearch = self
            .decode(response, "merchant_order", external_reference)
            .await?;

        // The API returns oldest first.
        Ok(search.elements.into_iter().last().map(Into::into))
    }

    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<Preference, PaymentError> {
        let reference = request.external_reference.clone();
        let body = MpPreferenceBody::from(request);
        let builder = self
            .http
            .post(self.url("/checkout/preferences"))
            .header("X-Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .json(&body);
        let response = self.send(builder).await?;
        let preference: MpPreference = self.decode(response, "preference", &reference).await?;

        tracing::info!(
            preference_id = %preference.id,
            external_reference = %reference,
            "Created checkout preference"
        );
        Ok(preference.into())
    }
}
