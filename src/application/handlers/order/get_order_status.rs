//! GetOrderStatusHandler - storefront polling with on-demand reconciliation.
//!
//! Unknown orders read as `pending` so a client polling before the order
//! write commits never sees an error. When the stored status is still
//! `pending` although the last notification already carried an approval
//! and the payment id is known, exactly one synchronous provider lookup
//! runs before answering.

use std::sync::Arc;

use crate::domain::order::{PaymentStatus, ReconcileMode};
use crate::ports::{OrderRepository, ReconciliationCounter, ReconciliationMetrics};

use super::errors::OrderCommandError;
use super::reconcile_notification::ReconcileNotificationHandler;

/// Topic recorded on snapshots written by the polling fallback.
pub const STATUS_POLL_TOPIC: &str = "payment";

/// `Cache-Control` for a status answer. Pending answers must never be cached.
pub fn cache_control_for(status: PaymentStatus) -> &'static str {
    if status.is_pending() {
        "no-store"
    } else {
        "public, max-age=60"
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderStatusQuery {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOrderStatusResult {
    pub status: PaymentStatus,
    /// Public order number; `None` when no order matched.
    pub order_number: Option<String>,
    /// A provider lookup ran for this request.
    pub fallback_used: bool,
}

impl GetOrderStatusResult {
    fn unknown() -> Self {
        Self {
            status: PaymentStatus::Pending,
            order_number: None,
            fallback_used: false,
        }
    }
}

pub struct GetOrderStatusHandler {
    repository: Arc<dyn OrderRepository>,
    reconciler: Arc<ReconcileNotificationHandler>,
    metrics: Arc<dyn ReconciliationMetrics>,
}

impl GetOrderStatusHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        reconciler: Arc<ReconcileNotificationHandler>,
        metrics: Arc<dyn ReconciliationMetrics>,
    ) -> Self {
        Self {
            repository,
            reconciler,
            metrics,
        }
    }

    pub async fn handle(
        &self,
        query: GetOrderStatusQuery,
    ) -> Result<GetOrderStatusResult, OrderCommandError> {
        let identifier = query.identifier.trim();
        if identifier.is_empty() {
            return Ok(GetOrderStatusResult::unknown());
        }

        let Some(order) = self.repository.find_by_any_identifier(identifier).await? else {
            tracing::debug!(identifier = %identifier, "Status poll for unknown order");
            return Ok(GetOrderStatusResult::unknown());
        };

        let order_number = order.public_number().map(str::to_string);
        let Some(payment_id) = order.stale_approval_payment_id().map(str::to_string) else {
            return Ok(GetOrderStatusResult {
                status: order.payment_status,
                order_number,
                fallback_used: false,
            });
        };

        self.metrics.increment(ReconciliationCounter::FallbackLookups);
        tracing::info!(
            order_id = %order.id,
            payment_id = %payment_id,
            "Stored status lags a seen approval; reconciling on read"
        );

        let status = match self
            .reconciler
            .reconcile_payment_only(
                STATUS_POLL_TOPIC,
                &payment_id,
                &payment_id,
                order.identifiers(),
                ReconcileMode::Normal,
            )
            .await
        {
            Ok(report) => report.final_status.unwrap_or(order.payment_status),
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Fallback reconciliation failed");
                order.payment_status
            }
        };

        if status == PaymentStatus::Approved {
            self.metrics.increment(ReconciliationCounter::AutoElevations);
        }

        Ok(GetOrderStatusResult {
            status,
            order_number,
            fallback_used: true,
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
    use crate::domain::foundation::Timestamp;
    use crate::domain::order::{Order, OrderPayload, WebhookSnapshot};
    use crate::ports::{MerchantOrderRecord, PaymentError, PaymentRecord};

    fn handler(
        orders: Vec<Order>,
    ) -> (GetOrderStatusHandler, MockPaymentProvider, Arc<AtomicReconciliationMetrics>) {
        let store: Arc<dyn OrderRepository> = Arc::new(InMemoryOrderStore::with_orders(orders));
        let provider = MockPaymentProvider::new();
        let metrics = Arc::new(AtomicReconciliationMetrics::new());
        let reconciler = Arc::new(ReconcileNotificationHandler::new(
            store.clone(),
            Arc::new(provider.clone()),
            Arc::new(InMemoryOrderEvents::new()),
            metrics.clone(),
        ));
        (
            GetOrderStatusHandler::new(store, reconciler, metrics.clone()),
            provider,
            metrics,
        )
    }

    fn stale_order() -> Order {
        let mut order = Order::place("NRN-1", Some("pref_1".into()), OrderPayload::default());
        order.payment_id = Some("123".into());
        order.last_mp_webhook = Some(WebhookSnapshot {
            topic: "payment".into(),
            id: "123".into(),
            status: PaymentStatus::Approved,
            at: Timestamp::now(),
        });
        order
    }

    fn query(id: &str) -> GetOrderStatusQuery {
        GetOrderStatusQuery {
            identifier: id.into(),
        }
    }

    #[test]
    fn only_settled_answers_are_cacheable() {
        assert_eq!(cache_control_for(PaymentStatus::Pending), "no-store");
        assert_eq!(cache_control_for(PaymentStatus::Rejected), "public, max-age=60");
    }

    #[tokio::test]
    async fn unknown_order_reads_pending_without_number() {
        let (handler, provider, _) = handler(vec![]);
        let result = handler.handle(query("NRN-404")).await.unwrap();
        assert_eq!(result, GetOrderStatusResult::unknown());
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn stale_pending_triggers_exactly_one_lookup() {
        let (handler, provider, metrics) = handler(vec![stale_order()]);
        provider.add_payment(PaymentRecord {
            id: "123".into(),
            status: Some("approved".into()),
            external_reference: Some("NRN-1".into()),
            ..Default::default()
        });

        let result = handler.handle(query("NRN-1")).await.unwrap();

        assert_eq!(result.status, PaymentStatus::Approved);
        assert_eq!(result.order_number.as_deref(), Some("NRN-1"));
        assert!(result.fallback_used);
        assert_eq!(provider.total_calls(), 1);
        assert_eq!(metrics.get(ReconciliationCounter::AutoElevations), 1);

        // The elevated status is stored; the next poll needs no lookup.
        let again = handler.handle(query("NRN-1")).await.unwrap();
        assert_eq!(again.status, PaymentStatus::Approved);
        assert_eq!(provider.total_calls(), 1);
    }

    #[tokio::test]
    async fn fallback_does_not_fetch_merchant_order_for_missing_preference() {
        let mut order = stale_order();
        order.preference_id = None;
        let (handler, provider, _) = handler(vec![order]);
        provider.add_payment(PaymentRecord {
            id: "123".into(),
            status: Some("approved".into()),
            external_reference: Some("NRN-1".into()),
            merchant_order_id: Some("9".into()),
            ..Default::default()
        });
        provider.add_merchant_order(MerchantOrderRecord {
            id: "9".into(),
            preference_id: Some("pref_9".into()),
            external_reference: Some("NRN-1".into()),
            payments: vec![],
        });

        let result = handler.handle(query("NRN-1")).await.unwrap();

        assert_eq!(result.status, PaymentStatus::Approved);
        assert_eq!(provider.call_count("get_merchant_order"), 0);
        assert_eq!(provider.total_calls(), 1);
    }

    #[tokio::test]
    async fn approved_order_performs_no_lookup() {
        let mut order = stale_order();
        order.payment_status = PaymentStatus::Approved;
        let (handler, provider, _) = handler(vec![order]);

        let result = handler.handle(query("pref_1")).await.unwrap();

        assert_eq!(result.status, PaymentStatus::Approved);
        assert!(!result.fallback_used);
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn failed_fallback_returns_stored_status() {
        let (handler, provider, metrics) = handler(vec![stale_order()]);
        provider.fail_method("get_payment", PaymentError::timeout("slow"));

        let result = handler.handle(query("NRN-1")).await.unwrap();

        assert_eq!(result.status, PaymentStatus::Pending);
        assert_eq!(metrics.get(ReconciliationCounter::AutoElevations), 0);
        assert_eq!(metrics.get(ReconciliationCounter::FallbackLookups), 1);
    }
}
