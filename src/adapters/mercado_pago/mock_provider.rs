//! Mock payment provider for testing.
//!
//! Serves pre-configured payments and merchant orders, records calls for
//! assertions and supports error injection per method.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    MerchantOrderRecord, PaymentError, PaymentProvider, PaymentRecord, Preference,
    PreferenceRequest,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_payment(PaymentRecord { id: "123".into(), status: Some("approved".into()), ..Default::default() });
/// mock.fail_method("get_merchant_order", PaymentError::timeout("slow"));
/// assert_eq!(mock.call_count("get_payment"), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    payments: HashMap<String, PaymentRecord>,
    merchant_orders: HashMap<String, MerchantOrderRecord>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<MethodCall>,
    created_preferences: Vec<PreferenceRequest>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub arg: String,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_payment(&self, payment: PaymentRecord) {
        let id = payment.id.clone();
        self.state().payments.insert(id, payment);
    }

    pub fn add_merchant_order(&self, order: MerchantOrderRecord) {
        let id = order.id.clone();
        self.state().merchant_orders.insert(id, order);
    }

    /// Make every call to `method` fail with `error`.
    pub fn fail_method(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().call_log.len()
    }

    pub fn created_preferences(&self) -> Vec<PreferenceRequest> {
        self.state().created_preferences.clone()
    }

    fn record(&self, method: &str, arg: &str) -> Result<(), PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            arg: arg.to_string(),
        });
        match state.method_errors.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentError> {
        self.record("get_payment", payment_id)?;
        self.state()
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("payment", payment_id))
    }

    async fn get_merchant_order(
        &self,
        merchant_order_id: &str,
    ) -> Result<MerchantOrderRecord, PaymentError> {
        self.record("get_merchant_order", merchant_order_id)?;
        self.state()
            .merchant_orders
            .get(merchant_order_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("merchant_order", merchant_order_id))
    }

    async fn find_merchant_order_by_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<MerchantOrderRecord>, PaymentError> {
        self.record("find_merchant_order_by_reference", external_reference)?;
        Ok(self
            .state()
            .merchant_orders
            .values()
            .find(|mo| mo.external_reference.as_deref() == Some(external_reference))
            .cloned())
    }

    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<Preference, PaymentError> {
        self.record("create_preference", &request.external_reference)?;
        let mut state = self.state();
        let id = format!("pref_{}", request.external_reference);
        state.created_preferences.push(request);
        Ok(Preference {
            init_point: Some(format!(
                "https://www.mercadopago.com/checkout/v1/redirect?pref_id={}",
                id
            )),
            sandbox_init_point: None,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PaymentErrorCode;

    #[tokio::test]
    async fn serves_configured_payment_and_counts_calls() {
        let mock = MockPaymentProvider::new();
        mock.add_payment(PaymentRecord {
            id: "123".into(),
            status: Some("approved".into()),
            ..Default::default()
        });

        let payment = mock.get_payment("123").await.unwrap();
        assert_eq!(payment.status.as_deref(), Some("approved"));
        assert_eq!(mock.call_count("get_payment"), 1);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let mock = MockPaymentProvider::new();
        let err = mock.get_payment("nope").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NotFound);
    }

    #[tokio::test]
    async fn injected_error_is_returned_and_still_recorded() {
        let mock = MockPaymentProvider::new();
        mock.fail_method("get_merchant_order", PaymentError::timeout("slow"));

        let err = mock.get_merchant_order("1").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::Timeout);
        assert_eq!(mock.total_calls(), 1);

        mock.clear_errors();
        assert!(mock.get_merchant_order("1").await.is_err());
    }
}
