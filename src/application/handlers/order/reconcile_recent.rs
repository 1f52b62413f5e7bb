//! ReconcileRecentHandler - sweep recent orders against the provider.
//!
//! Recovers from notifications that were acknowledged but never
//! processed. Orders are walked one at a time; each failure is counted
//! and the sweep continues.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::Timestamp;
use crate::domain::order::{Order, ReconcileMode};
use crate::ports::{OrderFilter, OrderRepository, PaymentProvider};

use super::errors::OrderCommandError;
use super::reconcile_notification::ReconcileNotificationHandler;

pub const DEFAULT_SWEEP_HOURS: i64 = 24;
/// Widest window an operator may sweep in one request.
pub const MAX_SWEEP_HOURS: i64 = 24 * 366;
const SWEEP_TOPIC_PAYMENT: &str = "payment";
const SWEEP_TOPIC_MERCHANT_ORDER: &str = "merchant_order";

#[derive(Debug, Clone)]
pub struct ReconcileRecentCommand {
    pub hours: i64,
    /// Include settled orders and apply the provider status unconditionally.
    pub force: bool,
}

impl Default for ReconcileRecentCommand {
    fn default() -> Self {
        Self {
            hours: DEFAULT_SWEEP_HOURS,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileRecentResult {
    pub examined: usize,
    pub reconciled: usize,
    /// Nothing to look up for these orders.
    pub skipped: usize,
    pub failed: usize,
}

enum SweepStep {
    Reconciled,
    Skipped,
    Failed,
}

pub struct ReconcileRecentHandler {
    repository: Arc<dyn OrderRepository>,
    provider: Arc<dyn PaymentProvider>,
    reconciler: Arc<ReconcileNotificationHandler>,
}

impl ReconcileRecentHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        provider: Arc<dyn PaymentProvider>,
        reconciler: Arc<ReconcileNotificationHandler>,
    ) -> Self {
        Self {
            repository,
            provider,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileRecentCommand,
    ) -> Result<ReconcileRecentResult, OrderCommandError> {
        if cmd.hours <= 0 {
            return Err(OrderCommandError::InvalidInput("hours must be positive".into()));
        }
        if cmd.hours > MAX_SWEEP_HOURS {
            return Err(OrderCommandError::InvalidInput(format!(
                "hours must not exceed {MAX_SWEEP_HOURS}"
            )));
        }
        let since = Timestamp::now()
            .checked_minus_hours(cmd.hours)
            .ok_or_else(|| OrderCommandError::InvalidInput("hours out of range".into()))?;

        let filter = OrderFilter {
            created_since: Some(since),
            ..Default::default()
        };
        let mode = if cmd.force {
            ReconcileMode::Reprocess
        } else {
            ReconcileMode::Normal
        };

        let mut result = ReconcileRecentResult::default();
        for order in self.repository.list(&filter).await? {
            if !cmd.force && !order.payment_status.is_pending() {
                continue;
            }
            result.examined += 1;
            match self.sweep_one(&order, mode).await {
                SweepStep::Reconciled => result.reconciled += 1,
                SweepStep::Skipped => result.skipped += 1,
                SweepStep::Failed => result.failed += 1,
            }
        }

        tracing::info!(
            hours = cmd.hours,
            force = cmd.force,
            examined = result.examined,
            reconciled = result.reconciled,
            skipped = result.skipped,
            failed = result.failed,
            "Reconcile sweep finished"
        );
        Ok(result)
    }

    async fn sweep_one(&self, order: &Order, mode: ReconcileMode) -> SweepStep {
        if let Some(payment_id) = &order.payment_id {
            return match self
                .reconciler
                .reconcile_payment(SWEEP_TOPIC_PAYMENT, payment_id, payment_id, order.identifiers(), mode)
                .await
            {
                Ok(_) => SweepStep::Reconciled,
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Sweep payment lookup failed");
                    SweepStep::Failed
                }
            };
        }

        let Some(reference) = order.external_reference.as_deref() else {
            return SweepStep::Skipped;
        };
        match self.provider.find_merchant_order_by_reference(reference).await {
            Ok(Some(merchant_order)) => {
                let id = merchant_order.id.clone();
                match self
                    .reconciler
                    .reconcile_merchant_order(SWEEP_TOPIC_MERCHANT_ORDER, &id, merchant_order, mode)
                    .await
                {
                    Ok(_) => SweepStep::Reconciled,
                    Err(e) => {
                        tracing::warn!(order_id = %order.id, error = %e, "Sweep reconciliation failed");
                        SweepStep::Failed
                    }
                }
            }
            Ok(None) => SweepStep::Skipped,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Merchant order search failed");
                SweepStep::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryOrderEvents;
    use crate::adapters::mercado_pago::MockPaymentProvider;
    use crate::adapters::metrics::AtomicReconciliationMetrics;
    use crate::adapters::storage::InMemoryOrderStore;
    use crate::domain::order::{IdentifierField, OrderPayload, PaymentStatus};
    use crate::ports::{MerchantOrderPayment, MerchantOrderRecord, PaymentError, PaymentRecord};

    fn setup(orders: Vec<Order>) -> (ReconcileRecentHandler, InMemoryOrderStore, MockPaymentProvider) {
        let store = InMemoryOrderStore::with_orders(orders);
        let provider = MockPaymentProvider::new();
        let repo: Arc<dyn OrderRepository> = Arc::new(store.clone());
        let reconciler = Arc::new(ReconcileNotificationHandler::new(
            repo.clone(),
            Arc::new(provider.clone()),
            Arc::new(InMemoryOrderEvents::new()),
            Arc::new(AtomicReconciliationMetrics::new()),
        ));
        (
            ReconcileRecentHandler::new(repo, Arc::new(provider.clone()), reconciler),
            store,
            provider,
        )
    }

    #[tokio::test]
    async fn sweep_recovers_missed_approvals() {
        let mut with_payment = Order::place("NRN-1", None, OrderPayload::default());
        with_payment.payment_id = Some("1".into());
        let by_reference = Order::place("NRN-2", None, OrderPayload::default());
        let mut settled = Order::place("NRN-3", None, OrderPayload::default());
        settled.payment_status = PaymentStatus::Approved;

        let (handler, store, provider) = setup(vec![with_payment, by_reference, settled]);
        provider.add_payment(PaymentRecord {
            id: "1".into(),
            status: Some("approved".into()),
            external_reference: Some("NRN-1".into()),
            ..Default::default()
        });
        provider.add_merchant_order(MerchantOrderRecord {
            id: "MO-2".into(),
            preference_id: None,
            external_reference: Some("NRN-2".into()),
            payments: vec![MerchantOrderPayment {
                id: "2".into(),
                status: Some("rejected".into()),
            }],
        });
        provider.add_payment(PaymentRecord {
            id: "2".into(),
            status: Some("rejected".into()),
            external_reference: Some("NRN-2".into()),
            ..Default::default()
        });

        let result = handler.handle(ReconcileRecentCommand::default()).await.unwrap();

        assert_eq!(
            result,
            ReconcileRecentResult {
                examined: 2,
                reconciled: 2,
                skipped: 0,
                failed: 0
            }
        );
        let second = store.find_by(IdentifierField::Id, "NRN-2").await.unwrap().unwrap();
        assert_eq!(second.payment_status, PaymentStatus::Rejected);
    }

    #[tokio::test]
    async fn oversized_window_is_rejected_without_provider_calls() {
        let (handler, _, provider) = setup(vec![Order::place("NRN-1", None, OrderPayload::default())]);

        for hours in [MAX_SWEEP_HOURS + 1, 100_000_000_000, i64::MAX] {
            let err = handler
                .handle(ReconcileRecentCommand { hours, force: false })
                .await
                .unwrap_err();
            assert!(matches!(err, OrderCommandError::InvalidInput(_)));
        }
        assert_eq!(provider.total_calls(), 0);

        let widest = handler
            .handle(ReconcileRecentCommand {
                hours: MAX_SWEEP_HOURS,
                force: false,
            })
            .await
            .unwrap();
        assert_eq!(widest.examined, 1);
    }

    #[tokio::test]
    async fn failures_are_counted_and_sweep_continues() {
        let mut a = Order::place("NRN-1", None, OrderPayload::default());
        a.payment_id = Some("1".into());
        let b = Order::place("NRN-2", None, OrderPayload::default());
        let (handler, _, provider) = setup(vec![a, b]);
        provider.fail_method("get_payment", PaymentError::timeout("slow"));

        let result = handler.handle(ReconcileRecentCommand::default()).await.unwrap();

        assert_eq!(result.examined, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
    }

    #[tokio::test]
    async fn force_includes_settled_orders() {
        let mut settled = Order::place("NRN-3", None, OrderPayload::default());
        settled.payment_status = PaymentStatus::Approved;
        settled.payment_id = Some("3".into());
        let (handler, store, provider) = setup(vec![settled]);
        provider.add_payment(PaymentRecord {
            id: "3".into(),
            status: Some("refunded".into()),
            external_reference: Some("NRN-3".into()),
            ..Default::default()
        });

        let result = handler
            .handle(ReconcileRecentCommand {
                force: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.reconciled, 1);
        let order = store.find_by(IdentifierField::Id, "NRN-3").await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Rejected);
    }

    #[tokio::test]
    async fn non_positive_window_is_rejected() {
        let (handler, _, _) = setup(vec![]);
        let err = handler
            .handle(ReconcileRecentCommand {
                hours: 0,
                force: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderCommandError::InvalidInput(_)));
    }
}
