//! DiagnoseOrderHandler - support view of one order's reconciliation state.
//!
//! Reports the raw stored value next to the decoded status, the last
//! notification snapshot, the live answer of the status endpoint and,
//! when a payment id is known, the provider's current verdict.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::order::{PaymentStatus, ProviderOutcome, ShippingStatus, WebhookSnapshot};
use crate::ports::{OrderRepository, PaymentProvider};

use super::errors::OrderCommandError;
use super::get_order_status::{cache_control_for, GetOrderStatusHandler, GetOrderStatusQuery};

#[derive(Debug, Clone)]
pub struct DiagnoseOrderQuery {
    pub identifier: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDiagnostics {
    pub order_id: String,
    /// Stored label in the store's own vocabulary.
    pub db_status: &'static str,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
    pub updated_at: String,
    pub payment_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub preference_id: Option<String>,
    pub external_reference: Option<String>,
    pub last_webhook: Option<WebhookSnapshot>,
    pub provider_status: Option<String>,
    pub provider_outcome: Option<ProviderOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
    /// What `GET /api/orders/:id/status` answers right now.
    pub api_status: PaymentStatus,
    pub api_cache_control: &'static str,
    /// Store vocabulary used to decode `db_status`.
    pub mapping_used: &'static str,
}

pub struct DiagnoseOrderHandler {
    repository: Arc<dyn OrderRepository>,
    provider: Arc<dyn PaymentProvider>,
    status: Arc<GetOrderStatusHandler>,
}

impl DiagnoseOrderHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        provider: Arc<dyn PaymentProvider>,
        status: Arc<GetOrderStatusHandler>,
    ) -> Self {
        Self {
            repository,
            provider,
            status,
        }
    }

    pub async fn handle(
        &self,
        query: DiagnoseOrderQuery,
    ) -> Result<OrderDiagnostics, OrderCommandError> {
        let order = self
            .repository
            .find_by_any_identifier(&query.identifier)
            .await?
            .ok_or_else(|| OrderCommandError::OrderNotFound(query.identifier.clone()))?;

        let api = self
            .status
            .handle(GetOrderStatusQuery {
                identifier: query.identifier.clone(),
            })
            .await?;

        let (provider_status, provider_outcome, provider_error) = match &order.payment_id {
            Some(payment_id) => match self.provider.get_payment(payment_id).await {
                Ok(payment) => {
                    let outcome = ProviderOutcome::from_provider(payment.status.as_deref());
                    (payment.status, Some(outcome), None)
                }
                Err(e) => (None, None, Some(e.to_string())),
            },
            None => (None, None, None),
        };

        let vocabulary = self.repository.vocabulary();
        Ok(OrderDiagnostics {
            order_id: order.id.clone(),
            db_status: vocabulary.encode(order.payment_status),
            payment_status: order.payment_status,
            shipping_status: order.shipping_status,
            updated_at: order.updated_at.to_string(),
            payment_id: order.payment_id,
            merchant_order_id: order.merchant_order_id,
            preference_id: order.preference_id,
            external_reference: order.external_reference,
            last_webhook: order.last_mp_webhook,
            provider_status,
            provider_outcome,
            provider_error,
            api_status: api.status,
            api_cache_control: cache_control_for(api.status),
            mapping_used: vocabulary.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryOrderEvents;
    use crate::adapters::mercado_pago::MockPaymentProvider;
    use crate::adapters::metrics::AtomicReconciliationMetrics;
    use crate::adapters::storage::InMemoryOrderStore;
    use crate::application::handlers::order::ReconcileNotificationHandler;
    use crate::domain::order::{Order, OrderPayload};
    use crate::ports::PaymentRecord;

    fn handler(orders: Vec<Order>, provider: MockPaymentProvider) -> DiagnoseOrderHandler {
        let store: Arc<dyn OrderRepository> = Arc::new(InMemoryOrderStore::with_orders(orders));
        let metrics = Arc::new(AtomicReconciliationMetrics::new());
        let reconciler = Arc::new(ReconcileNotificationHandler::new(
            store.clone(),
            Arc::new(provider.clone()),
            Arc::new(InMemoryOrderEvents::new()),
            metrics.clone(),
        ));
        let status = Arc::new(GetOrderStatusHandler::new(store.clone(), reconciler, metrics));
        DiagnoseOrderHandler::new(store, Arc::new(provider), status)
    }

    #[tokio::test]
    async fn reports_stored_and_provider_views() {
        let mut order = Order::place("NRN-1", Some("pref_1".into()), OrderPayload::default());
        order.payment_status = PaymentStatus::Rejected;
        order.payment_id = Some("9".into());
        let provider = MockPaymentProvider::new();
        provider.add_payment(PaymentRecord {
            id: "9".into(),
            status: Some("charged_back".into()),
            ..Default::default()
        });

        let report = handler(vec![order], provider)
            .handle(DiagnoseOrderQuery {
                identifier: "pref_1".into(),
            })
            .await
            .unwrap();

        assert_eq!(report.order_id, "NRN-1");
        assert_eq!(report.db_status, "rejected");
        assert_eq!(report.provider_outcome, Some(ProviderOutcome::Cancelled));
        assert_eq!(report.api_status, PaymentStatus::Rejected);
        assert_eq!(report.api_cache_control, "public, max-age=60");
        assert_eq!(report.mapping_used, "english");
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let err = handler(vec![], MockPaymentProvider::new())
            .handle(DiagnoseOrderQuery {
                identifier: "nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderCommandError::OrderNotFound(_)));
    }
}
