//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `OrderRepository` - Order persistence keyed by alternate identifiers
//! - `PaymentProvider` - Authoritative payment state and preferences
//! - `OrderEventPublisher` - Side-effect sink for order transitions
//! - `ReconciliationMetrics` - Pipeline counters

mod event_publisher;
mod order_repository;
mod payment_provider;
mod reconciliation_metrics;

pub use event_publisher::{OrderEvent, OrderEventPublisher};
pub use order_repository::{OrderFilter, OrderRepository, UpsertOutcome};
pub use payment_provider::{
    BackUrls, MerchantOrderPayment, MerchantOrderRecord, PaymentError, PaymentErrorCode,
    PaymentProvider, PaymentRecord, Preference, PreferenceItem, PreferenceRequest,
};
pub use reconciliation_metrics::{ReconciliationCounter, ReconciliationMetrics};
