//! Shared wiring for HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use nerin_payments::adapters::http::{router, AppState};
use nerin_payments::adapters::{
    AtomicReconciliationMetrics, InMemoryOrderEvents, InMemoryOrderStore, MockPaymentProvider,
};
use nerin_payments::application::handlers::order::CheckoutSettings;
use nerin_payments::config::OpsConfig;
use nerin_payments::domain::order::{Order, OrderPayload, PaymentStatus};
use nerin_payments::domain::webhook::{compute_signature, SignatureVerifier, SIGNATURE_HEADER};

pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const DIAG_SECRET: &str = "diag-secret";
pub const PROBE_TOKEN: &str = "probe-token";

pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryOrderStore>,
    pub provider: MockPaymentProvider,
    pub events: InMemoryOrderEvents,
    pub metrics: Arc<AtomicReconciliationMetrics>,
}

pub fn ops_enabled() -> OpsConfig {
    OpsConfig {
        diag_secret: Some(DIAG_SECRET.to_string()),
        admin_probe_token: Some(PROBE_TOKEN.to_string()),
        enable_webhook_health: true,
    }
}

impl TestApp {
    pub fn new(orders: Vec<Order>) -> Self {
        Self::build(orders, Some(WEBHOOK_SECRET), ops_enabled())
    }

    pub fn build(orders: Vec<Order>, secret: Option<&str>, ops: OpsConfig) -> Self {
        let store = Arc::new(InMemoryOrderStore::with_orders(orders));
        let provider = MockPaymentProvider::new();
        let events = InMemoryOrderEvents::new();
        let metrics = Arc::new(AtomicReconciliationMetrics::new());
        let state = AppState::new(
            store.clone(),
            Arc::new(provider.clone()),
            Arc::new(events.clone()),
            metrics.clone(),
            SignatureVerifier::new(secret),
            ops,
            CheckoutSettings::default(),
        );
        Self {
            app: router(state),
            store,
            provider,
            events,
            metrics,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub fn pending_order(id: &str) -> Order {
    Order::place(id, None, OrderPayload::default())
}

pub fn order_with_status(id: &str, status: PaymentStatus) -> Order {
    let mut order = pending_order(id);
    order.payment_status = status;
    order
}

/// Signed webhook delivery. `probe` turns on the inline mode.
pub fn webhook(body: &Value, probe: bool) -> Request<Body> {
    let raw = body.to_string();
    let uri = if probe {
        "/api/webhooks/mp?probe=1"
    } else {
        "/api/webhooks/mp"
    };
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, compute_signature(WEBHOOK_SECRET, raw.as_bytes()));
    if probe {
        builder = builder.header("x-self-test", "1");
    }
    builder.body(Body::from(raw)).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    assert_eq!(response.status(), StatusCode::OK, "unexpected status");
    raw_json(response).await
}

pub async fn raw_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
