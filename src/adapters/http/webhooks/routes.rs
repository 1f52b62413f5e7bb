//! Route configuration for provider webhooks.

use axum::routing::post;
use axum::Router;

use super::super::state::AppState;
use super::handlers::receive_notification;

/// Creates the webhook router.
///
/// Both paths share one handler; the second is the URL registered in older
/// provider dashboards.
pub fn webhook_router() -> Router<AppState> {
    Router::new()
        .route("/api/webhooks/mp", post(receive_notification))
        .route("/api/mercado-pago/webhook", post(receive_notification))
}
