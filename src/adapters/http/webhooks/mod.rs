//! HTTP adapter for provider webhook ingress.

mod handlers;
mod routes;

pub use handlers::{run_probe, ProbeResult, SELF_TEST_HEADER};
pub use routes::webhook_router;
