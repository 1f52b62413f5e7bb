//! Lock-free counters behind the `ReconciliationMetrics` port.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::{ReconciliationCounter, ReconciliationMetrics};

/// Counter values keyed by counter name.
pub type MetricsSnapshot = BTreeMap<&'static str, u64>;

#[derive(Debug, Default)]
pub struct AtomicReconciliationMetrics {
    counters: [AtomicU64; ReconciliationCounter::ALL.len()],
}

impl AtomicReconciliationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(counter: ReconciliationCounter) -> usize {
        ReconciliationCounter::ALL
            .iter()
            .position(|c| *c == counter)
            .unwrap_or(0)
    }

    pub fn get(&self, counter: ReconciliationCounter) -> u64 {
        self.counters[Self::slot(counter)].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        ReconciliationCounter::ALL
            .iter()
            .map(|c| (c.as_str(), self.get(*c)))
            .collect()
    }
}

impl ReconciliationMetrics for AtomicReconciliationMetrics {
    fn increment(&self, counter: ReconciliationCounter) {
        self.counters[Self::slot(counter)].fetch_add(1, Ordering::Relaxed);
    }
}
