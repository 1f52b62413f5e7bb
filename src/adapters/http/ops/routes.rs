//! Route configuration for operator endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::config::OpsConfig;

use super::super::state::AppState;
use super::handlers::{diagnose_order, metrics, reconcile_recent, webhook_health};

/// Creates the operator router.
///
/// Diagnostics, metrics and the sweep exist only when a diagnostic secret
/// is configured. The webhook self-probe additionally needs the health
/// flag and a probe token.
pub fn ops_router(ops: &OpsConfig) -> Router<AppState> {
    let mut router = Router::new();

    if ops.diagnostics_enabled() {
        router = router
            .route("/ops/order-status/:id", get(diagnose_order))
            .route("/ops/metrics", get(metrics))
            .route("/ops/reconcile", post(reconcile_recent));
    }

    if ops.webhook_health_enabled() {
        router = router.route("/ops/health/mp-webhook", get(webhook_health));
    }

    router
}
