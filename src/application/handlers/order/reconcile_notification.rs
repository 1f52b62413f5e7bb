//! ReconcileNotificationHandler - folds one provider notification into an order.
//!
//! The provider is the source of truth: the notification only says *what*
//! changed, the handler fetches the authoritative record and applies it.
//!
//! - `payment` topics fetch the payment, map its status, learn identifiers
//!   (best-effort merchant-order lookup for a missing preference id) and
//!   upsert the order.
//! - `merchant_order` topics fetch the merchant order; with no payments the
//!   order is kept `pending`, otherwise the first payment re-enters the
//!   payment path.
//!
//! Provider failures surface as `WebhookError::LookupFailure` and leave the
//! store untouched; the provider's redelivery is the retry mechanism.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::Timestamp;
use crate::domain::order::{
    OrderIdentifiers, PaymentStatus, PaymentTransition, PaymentUpdate, ProviderOutcome,
    ReconcileMode, WebhookSnapshot,
};
use crate::domain::webhook::{Notification, NotificationKind, WebhookError};
use crate::ports::{
    MerchantOrderRecord, OrderEvent, OrderEventPublisher, OrderRepository, PaymentError,
    PaymentProvider, ReconciliationCounter, ReconciliationMetrics, UpsertOutcome,
};

/// Command to reconcile one notification.
#[derive(Debug, Clone)]
pub struct ReconcileNotificationCommand {
    pub notification: Notification,
    pub mode: ReconcileMode,
}

impl ReconcileNotificationCommand {
    pub fn new(notification: Notification) -> Self {
        Self {
            notification,
            mode: ReconcileMode::Normal,
        }
    }

    pub fn reprocess(mut self) -> Self {
        self.mode = ReconcileMode::Reprocess;
        self
    }
}

/// What happened to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Updated {
        order_id: String,
        changed: bool,
        regression_ignored: bool,
    },
    StubCreated {
        order_id: String,
    },
    /// No identifiers to match or seed a stub with.
    Unresolvable,
    /// Topic is not reconciled.
    Ignored,
}

/// Result of a reconciliation, returned to probes and sweeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub topic: String,
    pub notification_id: String,
    /// Payment that decided the status, when one was fetched.
    pub payment_id: Option<String>,
    /// Raw provider status of that payment.
    pub provider_status: Option<String>,
    pub provider_outcome: Option<ProviderOutcome>,
    /// Status the order ends up with.
    pub final_status: Option<PaymentStatus>,
    pub outcome: ReconcileOutcome,
}

/// Handler for provider notifications.
pub struct ReconcileNotificationHandler {
    repository: Arc<dyn OrderRepository>,
    provider: Arc<dyn PaymentProvider>,
    publisher: Arc<dyn OrderEventPublisher>,
    metrics: Arc<dyn ReconciliationMetrics>,
}

impl ReconcileNotificationHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        provider: Arc<dyn PaymentProvider>,
        publisher: Arc<dyn OrderEventPublisher>,
        metrics: Arc<dyn ReconciliationMetrics>,
    ) -> Self {
        Self {
            repository,
            provider,
            publisher,
            metrics,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileNotificationCommand,
    ) -> Result<ReconcileReport, WebhookError> {
        let Notification { topic, id, kind } = cmd.notification;
        match kind {
            NotificationKind::Payment => {
                self.reconcile_payment(&topic, &id, &id, OrderIdentifiers::default(), cmd.mode)
                    .await
            }
            NotificationKind::MerchantOrder => {
                let merchant_order = self
                    .provider
                    .get_merchant_order(&id)
                    .await
                    .map_err(|e| self.lookup_failure(&topic, &id, e))?;
                self.reconcile_merchant_order(&topic, &id, merchant_order, cmd.mode)
                    .await
            }
            NotificationKind::Unsupported(_) => {
                tracing::info!(topic = %topic, notification_id = %id, "Ignoring unsupported topic");
                Ok(ReconcileReport {
                    topic,
                    notification_id: id,
                    payment_id: None,
                    provider_status: None,
                    provider_outcome: None,
                    final_status: None,
                    outcome: ReconcileOutcome::Ignored,
                })
            }
        }
    }

    /// Merchant-order path for an already fetched record.
    pub async fn reconcile_merchant_order(
        &self,
        topic: &str,
        notification_id: &str,
        merchant_order: MerchantOrderRecord,
        mode: ReconcileMode,
    ) -> Result<ReconcileReport, WebhookError> {
        let hints = OrderIdentifiers {
            preference_id: merchant_order.preference_id.clone(),
            external_reference: merchant_order.external_reference.clone(),
            payment_id: None,
            merchant_order_id: Some(merchant_order.id.clone()),
        };

        let Some(first_payment) = merchant_order.payments.first() else {
            tracing::info!(
                topic = %topic,
                merchant_order_id = %merchant_order.id,
                "Merchant order has no payments yet"
            );
            let update = PaymentUpdate {
                status: PaymentStatus::Pending,
                identifiers: hints,
                snapshot: snapshot(topic, notification_id, PaymentStatus::Pending),
            };
            let outcome = self.apply(&update, mode).await?;
            return Ok(ReconcileReport {
                topic: topic.to_string(),
                notification_id: notification_id.to_string(),
                payment_id: None,
                provider_status: None,
                provider_outcome: None,
                final_status: outcome.1,
                outcome: outcome.0,
            });
        };

        let payment_id = first_payment.id.clone();
        self.reconcile_payment(topic, notification_id, &payment_id, hints, mode)
            .await
    }

    /// Payment path. `hints` carries identifiers already known to the caller.
    pub async fn reconcile_payment(
        &self,
        topic: &str,
        notification_id: &str,
        payment_id: &str,
        hints: OrderIdentifiers,
        mode: ReconcileMode,
    ) -> Result<ReconcileReport, WebhookError> {
        self.reconcile_payment_with(topic, notification_id, payment_id, hints, mode, true)
            .await
    }

    /// Payment path limited to a single provider call.
    ///
    /// A missing preference id is not looked up through the merchant order.
    pub async fn reconcile_payment_only(
        &self,
        topic: &str,
        notification_id: &str,
        payment_id: &str,
        hints: OrderIdentifiers,
        mode: ReconcileMode,
    ) -> Result<ReconcileReport, WebhookError> {
        self.reconcile_payment_with(topic, notification_id, payment_id, hints, mode, false)
            .await
    }

    async fn reconcile_payment_with(
        &self,
        topic: &str,
        notification_id: &str,
        payment_id: &str,
        hints: OrderIdentifiers,
        mode: ReconcileMode,
        learn_preference: bool,
    ) -> Result<ReconcileReport, WebhookError> {
        let payment = self
            .provider
            .get_payment(payment_id)
            .await
            .map_err(|e| self.lookup_failure(topic, payment_id, e))?;

        let status = PaymentStatus::from_provider(payment.status.as_deref());
        let mut identifiers = OrderIdentifiers {
            preference_id: payment.preference_id.clone(),
            external_reference: payment.external_reference.clone(),
            payment_id: Some(payment.id.clone()),
            merchant_order_id: payment.merchant_order_id.clone(),
        };
        identifiers.merge_missing(&hints);

        if learn_preference && identifiers.preference_id.is_none() {
            if let Some(merchant_order_id) = identifiers.merchant_order_id.clone() {
                self.learn_preference(&mut identifiers, &merchant_order_id).await;
            }
        }

        tracing::debug!(
            topic = %topic,
            payment_id = %payment.id,
            provider_status = payment.status.as_deref().unwrap_or("-"),
            status = %status,
            "Fetched authoritative payment"
        );

        let update = PaymentUpdate {
            status,
            identifiers,
            snapshot: snapshot(topic, notification_id, status),
        };
        let (outcome, final_status) = self.apply(&update, mode).await?;

        Ok(ReconcileReport {
            topic: topic.to_string(),
            notification_id: notification_id.to_string(),
            payment_id: Some(payment.id),
            provider_outcome: Some(ProviderOutcome::from_provider(payment.status.as_deref())),
            provider_status: payment.status,
            final_status,
            outcome,
        })
    }

    /// Best-effort: a failure here never aborts the payment update.
    async fn learn_preference(&self, identifiers: &mut OrderIdentifiers, merchant_order_id: &str) {
        match self.provider.get_merchant_order(merchant_order_id).await {
            Ok(merchant_order) => {
                identifiers.merge_missing(&OrderIdentifiers {
                    preference_id: merchant_order.preference_id,
                    external_reference: merchant_order.external_reference,
                    payment_id: None,
                    merchant_order_id: None,
                });
            }
            Err(e) => {
                tracing::warn!(
                    merchant_order_id = %merchant_order_id,
                    error = %e,
                    "Could not fetch parent merchant order; continuing without preference id"
                );
            }
        }
    }

    async fn apply(
        &self,
        update: &PaymentUpdate,
        mode: ReconcileMode,
    ) -> Result<(ReconcileOutcome, Option<PaymentStatus>), WebhookError> {
        let outcome = self.repository.upsert_payment_status(update, mode).await?;

        match outcome {
            UpsertOutcome::Updated { order, transition } => {
                match transition {
                    PaymentTransition::Changed {
                        from,
                        to,
                        apply_inventory,
                    } => {
                        self.metrics.increment(ReconciliationCounter::StatusChanges);
                        tracing::info!(
                            order_id = %order.id,
                            from = %from,
                            to = %to,
                            topic = %update.snapshot.topic,
                            "Payment status changed"
                        );
                        self.publish_transition(&order.id, order.payment_id.clone(), to, apply_inventory)
                            .await;
                    }
                    PaymentTransition::RegressionIgnored { current, attempted } => {
                        self.metrics
                            .increment(ReconciliationCounter::RegressionsIgnored);
                        tracing::warn!(
                            order_id = %order.id,
                            current = %current,
                            attempted = %attempted,
                            "Ignoring update that would regress a terminal status"
                        );
                    }
                    PaymentTransition::Unchanged(status) => {
                        tracing::debug!(order_id = %order.id, status = %status, "Payment status unchanged");
                    }
                }
                Ok((
                    ReconcileOutcome::Updated {
                        order_id: order.id.clone(),
                        changed: matches!(transition, PaymentTransition::Changed { .. }),
                        regression_ignored: matches!(
                            transition,
                            PaymentTransition::RegressionIgnored { .. }
                        ),
                    },
                    Some(order.payment_status),
                ))
            }
            UpsertOutcome::StubCreated { order } => {
                self.metrics.increment(ReconciliationCounter::StubsCreated);
                tracing::info!(
                    order_id = %order.id,
                    preference_id = order.preference_id.as_deref().unwrap_or("-"),
                    status = %order.payment_status,
                    "Created stub order from notification"
                );
                if order.payment_status != PaymentStatus::Pending {
                    self.publish_transition(
                        &order.id,
                        order.payment_id.clone(),
                        order.payment_status,
                        order.inventory_applied,
                    )
                    .await;
                }
                Ok((
                    ReconcileOutcome::StubCreated {
                        order_id: order.id.clone(),
                    },
                    Some(order.payment_status),
                ))
            }
            UpsertOutcome::Unresolvable => {
                tracing::warn!(
                    topic = %update.snapshot.topic,
                    notification_id = %update.snapshot.id,
                    "Notification has no identifiers to match an order"
                );
                Ok((ReconcileOutcome::Unresolvable, None))
            }
        }
    }

    async fn publish_transition(
        &self,
        order_id: &str,
        payment_id: Option<String>,
        to: PaymentStatus,
        apply_inventory: bool,
    ) {
        let event = match to {
            PaymentStatus::Approved => OrderEvent::PaymentApproved {
                order_id: order_id.to_string(),
                payment_id,
                apply_inventory,
            },
            PaymentStatus::Rejected => OrderEvent::PaymentRejected {
                order_id: order_id.to_string(),
                payment_id,
            },
            PaymentStatus::Pending => return,
        };
        // The order is already stored; a failed side effect is logged only.
        if let Err(e) = self.publisher.publish(event).await {
            tracing::error!(order_id = %order_id, error = %e, "Failed to publish order event");
        }
    }

    fn lookup_failure(&self, topic: &str, id: &str, error: PaymentError) -> WebhookError {
        self.metrics.increment(ReconciliationCounter::LookupFailures);
        tracing::warn!(
            topic = %topic,
            notification_id = %id,
            error = %error,
            retryable = error.is_retryable(),
            "Provider lookup failed"
        );
        WebhookError::LookupFailure {
            topic: topic.to_string(),
            id: id.to_string(),
            reason: error.to_string(),
        }
    }
}

fn snapshot(topic: &str, id: &str, status: PaymentStatus) -> WebhookSnapshot {
    WebhookSnapshot {
        topic: topic.to_string(),
        id: id.to_string(),
        status,
        at: Timestamp::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryOrderEvents;
    use crate::adapters::mercado_pago::MockPaymentProvider;
    use crate::adapters::metrics::AtomicReconciliationMetrics;
    use crate::adapters::storage::InMemoryOrderStore;
    use crate::domain::order::{IdentifierField, Order, OrderPayload};
    use crate::ports::{MerchantOrderPayment, PaymentRecord};

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        store: InMemoryOrderStore,
        provider: MockPaymentProvider,
        events: InMemoryOrderEvents,
        metrics: Arc<AtomicReconciliationMetrics>,
        handler: ReconcileNotificationHandler,
    }

    fn fixture(orders: Vec<Order>) -> Fixture {
        let store = InMemoryOrderStore::with_orders(orders);
        let provider = MockPaymentProvider::new();
        let events = InMemoryOrderEvents::new();
        let metrics = Arc::new(AtomicReconciliationMetrics::new());
        let handler = ReconcileNotificationHandler::new(
            Arc::new(store.clone()),
            Arc::new(provider.clone()),
            Arc::new(events.clone()),
            metrics.clone(),
        );
        Fixture {
            store,
            provider,
            events,
            metrics,
            handler,
        }
    }

    fn payment(id: &str, status: &str, reference: Option<&str>) -> PaymentRecord {
        PaymentRecord {
            id: id.into(),
            status: Some(status.into()),
            external_reference: reference.map(Into::into),
            ..Default::default()
        }
    }

    fn payment_cmd(id: &str) -> ReconcileNotificationCommand {
        ReconcileNotificationCommand::new(Notification::payment("payment", id))
    }

    fn merchant_order_cmd(id: &str) -> ReconcileNotificationCommand {
        ReconcileNotificationCommand::new(Notification {
            topic: "merchant_order".into(),
            id: id.into(),
            kind: NotificationKind::MerchantOrder,
        })
    }

    async fn stored(store: &InMemoryOrderStore, id: &str) -> Order {
        store
            .find_by(IdentifierField::Id, id)
            .await
            .unwrap()
            .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payment Path
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approved_payment_updates_order_by_order_number() {
        let f = fixture(vec![Order::place("NRN-1", None, OrderPayload::default())]);
        f.provider.add_payment(payment("123", "approved", Some("NRN-1")));

        let report = f.handler.handle(payment_cmd("123")).await.unwrap();

        assert_eq!(report.final_status, Some(PaymentStatus::Approved));
        let order = stored(&f.store, "NRN-1").await;
        assert_eq!(order.payment_status, PaymentStatus::Approved);
        assert_eq!(order.payment_id.as_deref(), Some("123"));
        assert_eq!(
            order.last_mp_webhook.map(|s| s.status),
            Some(PaymentStatus::Approved)
        );
        assert!(order.inventory_applied);
        assert_eq!(f.events.count_of("order.payment_approved"), 1);
    }

    #[tokio::test]
    async fn repeated_delivery_is_idempotent() {
        let f = fixture(vec![Order::place("NRN-1", None, OrderPayload::default())]);
        f.provider.add_payment(payment("123", "approved", Some("NRN-1")));

        for _ in 0..4 {
            f.handler.handle(payment_cmd("123")).await.unwrap();
        }

        assert_eq!(f.store.len().await, 1);
        assert_eq!(stored(&f.store, "NRN-1").await.payment_status, PaymentStatus::Approved);
        assert_eq!(f.events.count_of("order.payment_approved"), 1);
        assert_eq!(f.metrics.get(ReconciliationCounter::StatusChanges), 1);
    }

    #[tokio::test]
    async fn unknown_order_gets_a_stub() {
        let f = fixture(vec![]);
        f.provider.add_payment(payment("77", "pending", Some("NRN-9")));

        let report = f.handler.handle(payment_cmd("77")).await.unwrap();

        assert!(matches!(report.outcome, ReconcileOutcome::StubCreated { .. }));
        let order = stored(&f.store, "NRN-9").await;
        assert!(order.is_stub);
        assert_eq!(order.payment_id.as_deref(), Some("77"));
        assert_eq!(f.metrics.get(ReconciliationCounter::StubsCreated), 1);
        assert!(f.events.published().is_empty());
    }

    #[tokio::test]
    async fn preference_id_is_learned_from_parent_merchant_order() {
        let mut order = Order::place("NRN-2", Some("pref_2".into()), OrderPayload::default());
        order.external_reference = None;
        order.order_number = None;
        let f = fixture(vec![order]);
        f.provider.add_payment(PaymentRecord {
            merchant_order_id: Some("MO-2".into()),
            ..payment("55", "rejected", None)
        });
        f.provider.add_merchant_order(MerchantOrderRecord {
            id: "MO-2".into(),
            preference_id: Some("pref_2".into()),
            external_reference: None,
            payments: vec![],
        });

        f.handler.handle(payment_cmd("55")).await.unwrap();

        let order = stored(&f.store, "NRN-2").await;
        assert_eq!(order.payment_status, PaymentStatus::Rejected);
        assert_eq!(order.merchant_order_id.as_deref(), Some("MO-2"));
        assert_eq!(f.events.count_of("order.payment_rejected"), 1);
    }

    #[tokio::test]
    async fn merchant_order_lookup_failure_does_not_abort_payment_update() {
        let f = fixture(vec![Order::place("NRN-3", None, OrderPayload::default())]);
        f.provider.add_payment(PaymentRecord {
            merchant_order_id: Some("MO-3".into()),
            ..payment("9", "approved", Some("NRN-3"))
        });
        f.provider
            .fail_method("get_merchant_order", PaymentError::timeout("slow"));

        f.handler.handle(payment_cmd("9")).await.unwrap();

        assert_eq!(stored(&f.store, "NRN-3").await.payment_status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn payment_lookup_failure_is_a_no_op() {
        let f = fixture(vec![Order::place("NRN-4", None, OrderPayload::default())]);
        f.provider.fail_method("get_payment", PaymentError::network("reset"));

        let err = f.handler.handle(payment_cmd("1")).await.unwrap_err();

        assert_eq!(err.code(), "LOOKUP_FAILURE");
        let order = stored(&f.store, "NRN-4").await;
        assert!(order.last_mp_webhook.is_none());
        assert_eq!(f.metrics.get(ReconciliationCounter::LookupFailures), 1);
    }

    #[tokio::test]
    async fn stale_pending_does_not_regress_approved_order() {
        let f = fixture(vec![Order::place("NRN-5", None, OrderPayload::default())]);
        f.provider.add_payment(payment("1", "approved", Some("NRN-5")));
        f.handler.handle(payment_cmd("1")).await.unwrap();

        f.provider.add_payment(payment("2", "in_process", Some("NRN-5")));
        let report = f.handler.handle(payment_cmd("2")).await.unwrap();

        assert_eq!(report.final_status, Some(PaymentStatus::Approved));
        assert_eq!(f.metrics.get(ReconciliationCounter::RegressionsIgnored), 1);
        let order = stored(&f.store, "NRN-5").await;
        assert_eq!(order.payment_status, PaymentStatus::Approved);
        assert_eq!(
            order.last_mp_webhook.map(|s| s.status),
            Some(PaymentStatus::Pending)
        );
    }

    #[tokio::test]
    async fn reprocess_applies_latest_status() {
        let f = fixture(vec![Order::place("NRN-6", None, OrderPayload::default())]);
        f.provider.add_payment(payment("1", "approved", Some("NRN-6")));
        f.handler.handle(payment_cmd("1")).await.unwrap();

        f.provider.add_payment(payment("1", "refunded", Some("NRN-6")));
        let report = f.handler.handle(payment_cmd("1").reprocess()).await.unwrap();

        assert_eq!(report.final_status, Some(PaymentStatus::Rejected));
        assert_eq!(report.provider_outcome, Some(ProviderOutcome::Cancelled));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Merchant Order Path
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn merchant_order_without_payments_creates_pending_stub() {
        let f = fixture(vec![]);
        f.provider.add_merchant_order(MerchantOrderRecord {
            id: "MO-1".into(),
            preference_id: Some("pref123".into()),
            external_reference: None,
            payments: vec![],
        });

        let report = f.handler.handle(merchant_order_cmd("MO-1")).await.unwrap();

        assert_eq!(report.final_status, Some(PaymentStatus::Pending));
        let order = f
            .store
            .find_by(IdentifierField::PreferenceId, "pref123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.is_stub);

        // A second delivery reuses the stub.
        f.handler.handle(merchant_order_cmd("MO-1")).await.unwrap();
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn merchant_order_with_payments_delegates_to_first_payment() {
        let f = fixture(vec![Order::place("NRN-7", Some("pref_7".into()), OrderPayload::default())]);
        f.provider.add_merchant_order(MerchantOrderRecord {
            id: "MO-7".into(),
            preference_id: Some("pref_7".into()),
            external_reference: Some("NRN-7".into()),
            payments: vec![
                MerchantOrderPayment {
                    id: "700".into(),
                    status: Some("approved".into()),
                },
                MerchantOrderPayment {
                    id: "701".into(),
                    status: Some("rejected".into()),
                },
            ],
        });
        f.provider.add_payment(payment("700", "approved", None));

        let report = f.handler.handle(merchant_order_cmd("MO-7")).await.unwrap();

        assert_eq!(report.payment_id.as_deref(), Some("700"));
        assert_eq!(f.provider.call_count("get_payment"), 1);
        let order = stored(&f.store, "NRN-7").await;
        assert_eq!(order.payment_status, PaymentStatus::Approved);
        assert_eq!(order.merchant_order_id.as_deref(), Some("MO-7"));
    }

    #[tokio::test]
    async fn unsupported_topic_is_ignored_without_lookups() {
        let f = fixture(vec![]);
        let cmd = ReconcileNotificationCommand::new(Notification {
            topic: "chargebacks".into(),
            id: "1".into(),
            kind: NotificationKind::Unsupported("chargebacks".into()),
        });

        let report = f.handler.handle(cmd).await.unwrap();

        assert_eq!(report.outcome, ReconcileOutcome::Ignored);
        assert_eq!(f.provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn payment_without_identifiers_is_unresolvable() {
        let f = fixture(vec![]);
        f.provider.add_payment(payment("3", "approved", None));

        let report = f.handler.handle(payment_cmd("3")).await.unwrap();

        assert_eq!(report.outcome, ReconcileOutcome::Unresolvable);
        assert!(f.store.is_empty().await);
    }
}
