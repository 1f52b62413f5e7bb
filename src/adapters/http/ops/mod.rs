//! HTTP adapter for diagnostics, metrics, sweeps and the webhook self-probe.

mod handlers;
mod routes;

pub use routes::ops_router;
