//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `storage` - Order stores (JSON file, in-memory)
//! - `postgres` - Relational order store
//! - `mercado_pago` - Payment provider client and test double
//! - `events` - Order event sinks
//! - `metrics` - Reconciliation counters
//! - `http` - Axum routes

pub mod events;
pub mod http;
pub mod mercado_pago;
pub mod metrics;
pub mod postgres;
pub mod storage;

pub use events::{InMemoryOrderEvents, LoggingEventPublisher};
pub use mercado_pago::{MercadoPagoClient, MercadoPagoSettings, MockPaymentProvider};
pub use metrics::AtomicReconciliationMetrics;
pub use postgres::PostgresOrderRepository;
pub use storage::{FileOrderStore, InMemoryOrderStore};
