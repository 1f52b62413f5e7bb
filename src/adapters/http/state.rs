//! Shared application state for the HTTP layer.

use std::sync::Arc;

use crate::adapters::metrics::AtomicReconciliationMetrics;
use crate::application::handlers::order::{
    CheckoutSettings, CreateOrderHandler, DeleteOrderHandler, DiagnoseOrderHandler,
    GetOrderStatusHandler, ListOrdersHandler, ReconcileNotificationHandler,
    ReconcileRecentHandler, UpdateOrderHandler,
};
use crate::config::OpsConfig;
use crate::domain::webhook::SignatureVerifier;
use crate::ports::{OrderEventPublisher, OrderRepository, PaymentProvider, ReconciliationMetrics};

/// Dependencies shared by every route.
///
/// Cloned per request; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn OrderRepository>,
    pub provider: Arc<dyn PaymentProvider>,
    pub publisher: Arc<dyn OrderEventPublisher>,
    pub metrics: Arc<AtomicReconciliationMetrics>,
    pub verifier: Arc<SignatureVerifier>,
    pub ops: Arc<OpsConfig>,
    pub checkout: CheckoutSettings,
    reconciler: Arc<ReconcileNotificationHandler>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        provider: Arc<dyn PaymentProvider>,
        publisher: Arc<dyn OrderEventPublisher>,
        metrics: Arc<AtomicReconciliationMetrics>,
        verifier: SignatureVerifier,
        ops: OpsConfig,
        checkout: CheckoutSettings,
    ) -> Self {
        let reconciler = Arc::new(ReconcileNotificationHandler::new(
            repository.clone(),
            provider.clone(),
            publisher.clone(),
            metrics.clone(),
        ));
        Self {
            repository,
            provider,
            publisher,
            metrics,
            verifier: Arc::new(verifier),
            ops: Arc::new(ops),
            checkout,
            reconciler,
        }
    }

    pub fn metrics_sink(&self) -> Arc<dyn ReconciliationMetrics> {
        self.metrics.clone()
    }

    /// The reconciliation engine, shared with detached webhook tasks.
    pub fn reconciler(&self) -> Arc<ReconcileNotificationHandler> {
        self.reconciler.clone()
    }

    pub fn status_handler(&self) -> GetOrderStatusHandler {
        GetOrderStatusHandler::new(
            self.repository.clone(),
            self.reconciler(),
            self.metrics_sink(),
        )
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.repository.clone(),
            self.provider.clone(),
            self.checkout.clone(),
        )
    }

    pub fn update_order_handler(&self) -> UpdateOrderHandler {
        UpdateOrderHandler::new(self.repository.clone(), self.publisher.clone())
    }

    pub fn delete_order_handler(&self) -> DeleteOrderHandler {
        DeleteOrderHandler::new(self.repository.clone())
    }

    pub fn list_orders_handler(&self) -> ListOrdersHandler {
        ListOrdersHandler::new(self.repository.clone())
    }

    pub fn diagnose_order_handler(&self) -> DiagnoseOrderHandler {
        DiagnoseOrderHandler::new(
            self.repository.clone(),
            self.provider.clone(),
            Arc::new(self.status_handler()),
        )
    }

    pub fn reconcile_recent_handler(&self) -> ReconcileRecentHandler {
        ReconcileRecentHandler::new(
            self.repository.clone(),
            self.provider.clone(),
            self.reconciler(),
        )
    }
}
