//! HTTP adapters - REST API implementations.
//!
//! Each area has its own router; [`router`] assembles them over a shared
//! [`AppState`].

pub mod error;
pub mod ops;
pub mod orders;
pub mod state;
pub mod webhooks;

use axum::Router;

pub use error::{ApiError, ErrorResponse};
pub use ops::ops_router;
pub use orders::order_router;
pub use state::AppState;
pub use webhooks::{run_probe, webhook_router, ProbeResult, SELF_TEST_HEADER};

/// Builds the full application router.
///
/// Operator routes are mounted according to `state.ops`.
pub fn router(state: AppState) -> Router {
    let ops = state.ops.clone();
    Router::new()
        .merge(order_router())
        .merge(webhook_router())
        .merge(ops_router(&ops))
        .with_state(state)
}
