//! Route configuration for order endpoints.

use axum::routing::{get, put};
use axum::Router;

use super::super::state::AppState;
use super::handlers::{create_order, delete_order, get_order_status, list_orders, update_order};

/// Creates the order router.
///
/// Routes:
/// - `POST /api/orders` - Checkout
/// - `GET /api/orders` - Admin listing (`payment_status`, `include_deleted`)
/// - `GET /api/orders/:id/status` - Storefront polling
/// - `GET /api/orders/test/:id/status` - Same contract, used by the test storefront
/// - `PUT /api/orders/:id` - Admin edit
/// - `DELETE /api/orders/:id` - Soft delete
pub fn order_router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/:id", put(update_order).delete(delete_order))
        .route("/api/orders/:id/status", get(get_order_status))
        .route("/api/orders/test/:id/status", get(get_order_status))
}
