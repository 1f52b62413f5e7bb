//! Alternate order identifiers and the order in which they are tried.
//!
//! An order can be addressed by its internal id, its order number, the
//! provider preference id or the external reference sent to the provider.
//! Lookup plans are plain data so the guess-then-verify behaviour can be
//! checked without a store.

use serde::Serialize;

/// A field an order can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierField {
    Id,
    OrderNumber,
    PreferenceId,
    ExternalReference,
}

impl IdentifierField {
    /// Column/property name used by the stores.
    pub fn column(&self) -> &'static str {
        match self {
            IdentifierField::Id => "id",
            IdentifierField::OrderNumber => "order_number",
            IdentifierField::PreferenceId => "preference_id",
            IdentifierField::ExternalReference => "external_reference",
        }
    }
}

/// One exact-match probe against a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupStep {
    pub field: IdentifierField,
    pub value: String,
}

impl LookupStep {
    fn new(field: IdentifierField, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// A value shape that hints at the field it most likely belongs to.
struct ShapeHint {
    prefix: &'static str,
    field: IdentifierField,
}

impl ShapeHint {
    fn matches(&self, value: &str) -> bool {
        value.len() > self.prefix.len() && value.starts_with(self.prefix)
    }
}

/// Tried in order; the first matching hint wins.
const SHAPE_HINTS: &[ShapeHint] = &[
    ShapeHint {
        prefix: "pref_",
        field: IdentifierField::PreferenceId,
    },
    ShapeHint {
        prefix: "NRN-",
        field: IdentifierField::OrderNumber,
    },
];

/// Fields tried when no hint applies, and after a hinted guess misses.
const DEFAULT_SEQUENCE: &[IdentifierField] = &[
    IdentifierField::PreferenceId,
    IdentifierField::OrderNumber,
    IdentifierField::Id,
    IdentifierField::ExternalReference,
];

/// Admin edits address orders by id, then order number, then preference id.
const ADMIN_SEQUENCE: &[IdentifierField] = &[
    IdentifierField::Id,
    IdentifierField::OrderNumber,
    IdentifierField::PreferenceId,
];

/// Plan for resolving an arbitrary identifier.
///
/// A shaped value is tried on its hinted field first, then on every other
/// field, and finally once more on the hinted field with the prefix removed.
pub fn resolution_plan(value: &str) -> Vec<LookupStep> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }

    let hint = SHAPE_HINTS.iter().find(|hint| hint.matches(value));
    let mut steps = Vec::with_capacity(DEFAULT_SEQUENCE.len() + 1);

    if let Some(hint) = hint {
        steps.push(LookupStep::new(hint.field, value));
    }
    for field in DEFAULT_SEQUENCE {
        if hint.map(|h| h.field) != Some(*field) {
            steps.push(LookupStep::new(*field, value));
        }
    }
    if let Some(hint) = hint {
        steps.push(LookupStep::new(hint.field, &value[hint.prefix.len()..]));
    }
    steps
}

/// Plan used by admin mutations, which never guess from shape.
pub fn admin_plan(value: &str) -> Vec<LookupStep> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }
    ADMIN_SEQUENCE
        .iter()
        .map(|field| LookupStep::new(*field, value))
        .collect()
}

/// Identifiers a notification knows about an order, used to resolve it
/// and to seed a stub when it does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIdentifiers {
    pub preference_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_id: Option<String>,
    pub merchant_order_id: Option<String>,
}

impl OrderIdentifiers {
    /// True when nothing could locate or seed an order.
    pub fn is_unresolvable(&self) -> bool {
        self.preference_id.is_none() && self.external_reference.is_none()
    }

    /// Fills gaps from another set, keeping values already known.
    pub fn merge_missing(&mut self, other: &OrderIdentifiers) {
        fill(&mut self.preference_id, &other.preference_id);
        fill(&mut self.external_reference, &other.external_reference);
        fill(&mut self.payment_id, &other.payment_id);
        fill(&mut self.merchant_order_id, &other.merchant_order_id);
    }
}

fn fill(slot: &mut Option<String>, candidate: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(candidate);
    }
}
