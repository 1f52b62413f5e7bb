//! Payment status vocabulary and the provider status mapper.
//!
//! The order keeps a three-state [`PaymentStatus`]. Provider statuses are
//! mapped through a fixed table; stores translate to and from their own
//! words through [`StatusVocabulary`] so raw strings never cross a store
//! boundary.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    /// Maps a provider status. Total: unknown or missing input is `Pending`.
    pub fn from_provider(raw: Option<&str>) -> Self {
        ProviderOutcome::from_provider(raw).payment_status()
    }

    /// Parses a stored or admin-supplied label in either vocabulary.
    pub fn parse_label(raw: &str) -> Option<Self> {
        LABEL_ALIASES
            .get(raw.trim().to_lowercase().as_str())
            .copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        *self == PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    const FIELD: &'static str = "payment_status";

    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (PaymentStatus::Pending, PaymentStatus::Approved)
                | (PaymentStatus::Pending, PaymentStatus::Rejected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            PaymentStatus::Pending => vec![PaymentStatus::Approved, PaymentStatus::Rejected],
            PaymentStatus::Approved | PaymentStatus::Rejected => vec![],
        }
    }
}

/// Finer-grained reading of a provider status that keeps cancellations
/// apart from plain rejections. Only used for diagnostics; orders store
/// the folded [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderOutcome {
    Approved,
    Rejected,
    Cancelled,
    Pending,
}

/// Provider status -> outcome. Matching is case-insensitive.
pub const PROVIDER_STATUS_TABLE: &[(&str, ProviderOutcome)] = &[
    ("approved", ProviderOutcome::Approved),
    ("rejected", ProviderOutcome::Rejected),
    ("cancelled", ProviderOutcome::Cancelled),
    ("canceled", ProviderOutcome::Cancelled),
    ("refunded", ProviderOutcome::Cancelled),
    ("charged_back", ProviderOutcome::Cancelled),
    ("pending", ProviderOutcome::Pending),
    ("in_process", ProviderOutcome::Pending),
];

impl ProviderOutcome {
    pub fn from_provider(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return ProviderOutcome::Pending;
        };
        PROVIDER_STATUS_TABLE
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(raw))
            .map(|(_, outcome)| *outcome)
            .unwrap_or(ProviderOutcome::Pending)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            ProviderOutcome::Approved => PaymentStatus::Approved,
            ProviderOutcome::Rejected | ProviderOutcome::Cancelled => PaymentStatus::Rejected,
            ProviderOutcome::Pending => PaymentStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderOutcome::Approved => "approved",
            ProviderOutcome::Rejected => "rejected",
            ProviderOutcome::Cancelled => "cancelled",
            ProviderOutcome::Pending => "pending",
        }
    }
}

static LABEL_ALIASES: Lazy<HashMap<&'static str, PaymentStatus>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for label in ["pending", "pendiente", "in_process", "in process", "inprocess"] {
        map.insert(label, PaymentStatus::Pending);
    }
    for label in ["approved", "aprobado", "pagado", "paid"] {
        map.insert(label, PaymentStatus::Approved);
    }
    for label in [
        "rejected",
        "rechazado",
        "cancelled",
        "canceled",
        "cancelado",
        "refunded",
        "charged_back",
    ] {
        map.insert(label, PaymentStatus::Rejected);
    }
    map
});

/// Words a store uses for payment status at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVocabulary {
    English,
    Spanish,
}

impl StatusVocabulary {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusVocabulary::English => "english",
            StatusVocabulary::Spanish => "spanish",
        }
    }

    pub fn encode(&self, status: PaymentStatus) -> &'static str {
        match (self, status) {
            (StatusVocabulary::English, status) => status.as_str(),
            (StatusVocabulary::Spanish, PaymentStatus::Pending) => "pendiente",
            (StatusVocabulary::Spanish, PaymentStatus::Approved) => "aprobado",
            (StatusVocabulary::Spanish, PaymentStatus::Rejected) => "rechazado",
        }
    }

    /// Reads a stored label. Either vocabulary is accepted so records
    /// written by older code still load; unreadable values are `Pending`.
    pub fn decode(&self, raw: &str) -> PaymentStatus {
        PaymentStatus::parse_label(raw).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn maps_the_provider_table() {
        let cases = [
            ("approved", PaymentStatus::Approved),
            ("rejected", PaymentStatus::Rejected),
            ("cancelled", PaymentStatus::Rejected),
            ("refunded", PaymentStatus::Rejected),
            ("charged_back", PaymentStatus::Rejected),
            ("pending", PaymentStatus::Pending),
            ("in_process", PaymentStatus::Pending),
            ("in_mediation", PaymentStatus::Pending),
        ];
        for (raw, expected) in cases {
            assert_eq!(PaymentStatus::from_provider(Some(raw)), expected, "{raw}");
        }
    }

    #[test]
    fn mapping_ignores_case_and_padding() {
        assert_eq!(
            PaymentStatus::from_provider(Some("  APPROVED ")),
            PaymentStatus::Approved
        );
        assert_eq!(
            PaymentStatus::from_provider(Some("Charged_Back")),
            PaymentStatus::Rejected
        );
    }

    #[test]
    fn missing_provider_status_is_pending() {
        assert_eq!(PaymentStatus::from_provider(None), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_provider(Some("")), PaymentStatus::Pending);
    }

    #[test]
    fn cancellations_keep_their_own_outcome() {
        assert_eq!(
            ProviderOutcome::from_provider(Some("refunded")),
            ProviderOutcome::Cancelled
        );
        assert_eq!(
            ProviderOutcome::from_provider(Some("rejected")),
            ProviderOutcome::Rejected
        );
    }

    #[test]
    fn spanish_vocabulary_round_trips_every_status() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Approved,
            PaymentStatus::Rejected,
        ] {
            let label = StatusVocabulary::Spanish.encode(status);
            assert_eq!(StatusVocabulary::Spanish.decode(label), status);
        }
        assert_eq!(StatusVocabulary::Spanish.encode(PaymentStatus::Approved), "aprobado");
    }

    #[test]
    fn decode_accepts_legacy_aliases() {
        assert_eq!(StatusVocabulary::Spanish.decode("pagado"), PaymentStatus::Approved);
        assert_eq!(StatusVocabulary::English.decode("rechazado"), PaymentStatus::Rejected);
        assert_eq!(StatusVocabulary::English.decode("garbage"), PaymentStatus::Pending);
    }

    #[test]
    fn only_pending_can_move() {
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Approved));
        assert!(!PaymentStatus::Approved.can_transition_to(&PaymentStatus::Pending));
        assert!(!PaymentStatus::Rejected.can_transition_to(&PaymentStatus::Approved));
        assert!(PaymentStatus::Approved.is_terminal());
    }

    proptest! {
        #[test]
        fn mapping_is_total(raw in ".*") {
            let status = PaymentStatus::from_provider(Some(&raw));
            let known = PROVIDER_STATUS_TABLE
                .iter()
                .any(|(label, _)| label.eq_ignore_ascii_case(raw.trim()));
            if !known {
                prop_assert_eq!(status, PaymentStatus::Pending);
            }
        }
    }
}
