//! Shipping status, mutated only by admin edits.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingStatus {
    #[default]
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

static ALIASES: Lazy<HashMap<&'static str, ShippingStatus>> = Lazy::new(|| {
    let groups: [(&[&str], ShippingStatus); 4] = [
        (
            &["preparing", "pendiente", "preparando", "en preparacion", "en preparación"],
            ShippingStatus::Preparing,
        ),
        (
            &["shipped", "enviado", "despachado", "en camino"],
            ShippingStatus::Shipped,
        ),
        (&["delivered", "entregado", "finalizado"], ShippingStatus::Delivered),
        (
            &["cancelled", "canceled", "cancelado", "anulado", "anulada"],
            ShippingStatus::Cancelled,
        ),
    ];
    groups
        .into_iter()
        .flat_map(|(labels, status)| labels.iter().map(move |label| (*label, status)))
        .collect()
});

impl ShippingStatus {
    /// Parses an English or Spanish label.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        ALIASES
            .get(raw.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| {
                ValidationError::invalid_format("shipping_status", format!("unknown value '{raw}'"))
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingStatus::Preparing => "preparing",
            ShippingStatus::Shipped => "shipped",
            ShippingStatus::Delivered => "delivered",
            ShippingStatus::Cancelled => "cancelled",
        }
    }

    /// Label used by the flat-file store.
    pub fn as_spanish(&self) -> &'static str {
        match self {
            ShippingStatus::Preparing => "pendiente",
            ShippingStatus::Shipped => "enviado",
            ShippingStatus::Delivered => "entregado",
            ShippingStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for ShippingStatus {
    const FIELD: &'static str = "shipping_status";

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ShippingStatus::*;
        match self {
            Preparing => vec![Shipped, Cancelled],
            Shipped => vec![Delivered, Cancelled],
            Delivered | Cancelled => vec![],
        }
    }
}
