//! In-process reconciliation counters.

mod atomic_metrics;

pub use atomic_metrics::{AtomicReconciliationMetrics, MetricsSnapshot};
