//! Counters for the reconciliation pipeline.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationCounter {
    WebhooksReceived,
    WebhooksSkippedSignature,
    NotificationsMissingId,
    LookupFailures,
    StubsCreated,
    StatusChanges,
    RegressionsIgnored,
    FallbackLookups,
    /// Status polls that turned a stale pending into approved.
    AutoElevations,
}

impl ReconciliationCounter {
    pub const ALL: [ReconciliationCounter; 9] = [
        ReconciliationCounter::WebhooksReceived,
        ReconciliationCounter::WebhooksSkippedSignature,
        ReconciliationCounter::NotificationsMissingId,
        ReconciliationCounter::LookupFailures,
        ReconciliationCounter::StubsCreated,
        ReconciliationCounter::StatusChanges,
        ReconciliationCounter::RegressionsIgnored,
        ReconciliationCounter::FallbackLookups,
        ReconciliationCounter::AutoElevations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationCounter::WebhooksReceived => "webhooks_received",
            ReconciliationCounter::WebhooksSkippedSignature => "webhooks_skipped_signature",
            ReconciliationCounter::NotificationsMissingId => "notifications_missing_id",
            ReconciliationCounter::LookupFailures => "lookup_failures",
            ReconciliationCounter::StubsCreated => "stubs_created",
            ReconciliationCounter::StatusChanges => "status_changes",
            ReconciliationCounter::RegressionsIgnored => "regressions_ignored",
            ReconciliationCounter::FallbackLookups => "fallback_lookups",
            ReconciliationCounter::AutoElevations => "auto_elevations",
        }
    }
}

/// Injected counter sink. Implementations must be cheap and infallible.
pub trait ReconciliationMetrics: Send + Sync {
    fn increment(&self, counter: ReconciliationCounter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_is_object_safe() {
        fn _accepts_dyn(_metrics: &dyn ReconciliationMetrics) {}
    }

    #[test]
    fn counter_names_are_unique() {
        let mut names: Vec<_> = ReconciliationCounter::ALL.iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ReconciliationCounter::ALL.len());
    }
}
