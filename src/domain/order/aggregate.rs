//! Order aggregate.
//!
//! Payment state is only moved through [`Order::apply_payment`], admin
//! fields only through [`Order::apply_edit`]. Both append to the audit log
//! so every stored change can be traced back to what caused it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::identifier::{IdentifierField, OrderIdentifiers};
use super::payment_status::PaymentStatus;
use super::shipping_status::ShippingStatus;
use crate::domain::foundation::{StateMachine, Timestamp, ValidationError};

/// Oldest audit entries are dropped past this size.
pub const AUDIT_LOG_LIMIT: usize = 50;

/// Snapshot of the most recent notification folded into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSnapshot {
    pub topic: String,
    pub id: String,
    pub status: PaymentStatus,
    pub at: Timestamp,
}

/// What caused a stored change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeSource {
    Checkout,
    Notification { topic: String, id: String },
    AdminEdit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StubCreated { status: PaymentStatus },
    PaymentStatusChanged { from: PaymentStatus, to: PaymentStatus },
    PaymentStatusConfirmed { status: PaymentStatus },
    RegressionIgnored { current: PaymentStatus, attempted: PaymentStatus },
    FieldsUpdated { fields: Vec<String> },
    Deleted,
    Restored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: Timestamp,
    pub source: ChangeSource,
    #[serde(flatten)]
    pub action: AuditAction,
}

/// Checkout payload. Captured once and never touched by reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Whether a reconciliation pass may move a terminal payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Terminal statuses are kept; contradicting updates are only audited.
    #[default]
    Normal,
    /// The latest provider status is applied unconditionally.
    Reprocess,
}

/// Authoritative payment state to fold into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub identifiers: OrderIdentifiers,
    pub snapshot: WebhookSnapshot,
}

impl PaymentUpdate {
    pub fn source(&self) -> ChangeSource {
        ChangeSource::Notification {
            topic: self.snapshot.topic.clone(),
            id: self.snapshot.id.clone(),
        }
    }
}

/// Result of folding a [`PaymentUpdate`] into an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTransition {
    /// Stored status already matched.
    Unchanged(PaymentStatus),
    Changed {
        from: PaymentStatus,
        to: PaymentStatus,
        /// First approval of this order; stock must be taken now.
        apply_inventory: bool,
    },
    RegressionIgnored {
        current: PaymentStatus,
        attempted: PaymentStatus,
    },
}

/// Allow-listed admin mutation. `Some(None)` clears a text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderEdit {
    pub payment_status: Option<PaymentStatus>,
    pub shipping_status: Option<ShippingStatus>,
    pub tracking: Option<Option<String>>,
    pub carrier: Option<Option<String>>,
    pub shipping_note: Option<Option<String>>,
    pub restore: bool,
}

/// Field names an admin may change.
pub const EDITABLE_FIELDS: &[&str] = &[
    "payment_status",
    "shipping_status",
    "tracking",
    "carrier",
    "shipping_note",
];

impl OrderEdit {
    /// Builds an edit from a JSON object, keeping only allow-listed keys.
    /// `"deleted_at": null` requests a restore.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut edit = OrderEdit::default();
        for (key, value) in fields {
            match key.as_str() {
                "payment_status" => {
                    let raw = required_text(key, value)?;
                    edit.payment_status = Some(PaymentStatus::parse_label(&raw).ok_or_else(|| {
                        ValidationError::invalid_format(key.as_str(), format!("unknown value '{raw}'"))
                    })?);
                }
                "shipping_status" => {
                    let raw = required_text(key, value)?;
                    edit.shipping_status = Some(ShippingStatus::parse(&raw)?);
                }
                "tracking" => edit.tracking = Some(optional_text(key, value)?),
                "carrier" => edit.carrier = Some(optional_text(key, value)?),
                "shipping_note" => edit.shipping_note = Some(optional_text(key, value)?),
                "deleted_at" if value.is_null() => edit.restore = true,
                _ => {}
            }
        }
        Ok(edit)
    }

    pub fn is_empty(&self) -> bool {
        *self == OrderEdit::default()
    }
}

fn optional_text(field: &str, value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(ValidationError::invalid_format(field, "expected a string")),
    }
}

fn required_text(field: &str, value: &Value) -> Result<String, ValidationError> {
    optional_text(field, value)?.ok_or_else(|| ValidationError::empty_field(field))
}

/// Outcome of an admin edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub changed_fields: Vec<String>,
    pub shipping_transition: Option<(ShippingStatus, ShippingStatus)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: Option<String>,
    pub preference_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub last_mp_webhook: Option<WebhookSnapshot>,
    pub shipping_status: ShippingStatus,
    pub tracking: Option<String>,
    pub carrier: Option<String>,
    pub shipping_note: Option<String>,
    pub payload: OrderPayload,
    pub inventory_applied: bool,
    /// Created by a notification before any checkout record existed.
    pub is_stub: bool,
    pub audit_log: Vec<AuditEntry>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

fn stub_id(ids: &OrderIdentifiers) -> String {
    if let Some(reference) = &ids.external_reference {
        return reference.clone();
    }
    ids.preference_id
        .as_ref()
        .or(ids.merchant_order_id.as_ref())
        .or(ids.payment_id.as_ref())
        .map(|key| format!("STUB-{key}"))
        .unwrap_or_else(|| format!("STUB-{}", Uuid::new_v4().simple()))
}

/// Generates an order number of the form `NRN-DDMMYY-NNNN`.
pub fn generate_order_number(now: &Timestamp) -> String {
    let suffix = Uuid::new_v4().as_u128() % 9000 + 1000;
    format!("NRN-{}-{}", now.as_datetime().format("%d%m%y"), suffix)
}

impl Order {
    /// Order placed at checkout. Number, order number and external
    /// reference are the same value.
    pub fn place(id: impl Into<String>, preference_id: Option<String>, payload: OrderPayload) -> Self {
        let id = id.into();
        let now = Timestamp::now();
        let mut order = Self::blank(id.clone(), now);
        order.order_number = Some(id.clone());
        order.external_reference = Some(id);
        order.preference_id = preference_id;
        order.payload = payload;
        order.record(ChangeSource::Checkout, AuditAction::Created);
        order
    }

    /// Minimal order created by a notification that matched nothing.
    ///
    /// The id is derived from the identifiers so concurrent deliveries for
    /// the same order collide on insert instead of creating two stubs.
    pub fn stub(update: &PaymentUpdate) -> Self {
        let ids = &update.identifiers;
        let id = stub_id(ids);
        let mut order = Self::blank(id, update.snapshot.at);
        order.is_stub = true;
        order.order_number = ids.external_reference.clone();
        order.external_reference = ids.external_reference.clone();
        order.preference_id = ids.preference_id.clone();
        order.payment_id = ids.payment_id.clone();
        order.merchant_order_id = ids.merchant_order_id.clone();
        order.payment_status = update.status;
        order.last_mp_webhook = Some(update.snapshot.clone());
        order.record(update.source(), AuditAction::StubCreated { status: update.status });
        if update.status == PaymentStatus::Approved {
            order.inventory_applied = true;
        }
        order
    }

    fn blank(id: String, now: Timestamp) -> Self {
        Self {
            id,
            order_number: None,
            preference_id: None,
            external_reference: None,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            merchant_order_id: None,
            last_mp_webhook: None,
            shipping_status: ShippingStatus::Preparing,
            tracking: None,
            carrier: None,
            shipping_note: None,
            payload: OrderPayload::default(),
            inventory_applied: false,
            is_stub: false,
            audit_log: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Exact match on one identifier field.
    pub fn matches(&self, field: IdentifierField, value: &str) -> bool {
        match field {
            IdentifierField::Id => self.id == value,
            IdentifierField::OrderNumber => self.order_number.as_deref() == Some(value),
            IdentifierField::PreferenceId => self.preference_id.as_deref() == Some(value),
            IdentifierField::ExternalReference => {
                self.external_reference.as_deref() == Some(value)
            }
        }
    }

    /// Number shown to customers polling the order.
    pub fn public_number(&self) -> Option<&str> {
        [
            Some(self.id.as_str()),
            self.order_number.as_deref(),
            self.external_reference.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
    }

    pub fn identifiers(&self) -> OrderIdentifiers {
        OrderIdentifiers {
            preference_id: self.preference_id.clone(),
            external_reference: self
                .external_reference
                .clone()
                .or_else(|| self.order_number.clone()),
            payment_id: self.payment_id.clone(),
            merchant_order_id: self.merchant_order_id.clone(),
        }
    }

    /// Payment id to re-check when the stored status lags behind an
    /// approval already seen in a notification.
    pub fn stale_approval_payment_id(&self) -> Option<&str> {
        let hinted_approval = self
            .last_mp_webhook
            .as_ref()
            .is_some_and(|snapshot| snapshot.status == PaymentStatus::Approved);
        if self.payment_status.is_pending() && hinted_approval {
            self.payment_id.as_deref()
        } else {
            None
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Folds authoritative payment state into the order.
    ///
    /// The snapshot and any newly learned identifiers are always recorded.
    /// In [`ReconcileMode::Normal`] a terminal status is never replaced.
    pub fn apply_payment(&mut self, update: &PaymentUpdate, mode: ReconcileMode) -> PaymentTransition {
        let ids = &update.identifiers;
        if ids.payment_id.is_some() {
            self.payment_id.clone_from(&ids.payment_id);
        }
        if ids.merchant_order_id.is_some() {
            self.merchant_order_id.clone_from(&ids.merchant_order_id);
        }
        if self.preference_id.is_none() {
            self.preference_id.clone_from(&ids.preference_id);
        }
        if self.external_reference.is_none() {
            self.external_reference.clone_from(&ids.external_reference);
        }
        self.last_mp_webhook = Some(update.snapshot.clone());

        let current = self.payment_status;
        let attempted = update.status;
        let transition = if current == attempted {
            PaymentTransition::Unchanged(current)
        } else if mode == ReconcileMode::Reprocess || current.can_transition_to(&attempted) {
            self.payment_status = attempted;
            let apply_inventory = attempted == PaymentStatus::Approved && !self.inventory_applied;
            if apply_inventory {
                self.inventory_applied = true;
            }
            PaymentTransition::Changed {
                from: current,
                to: attempted,
                apply_inventory,
            }
        } else {
            PaymentTransition::RegressionIgnored { current, attempted }
        };

        let action = match transition {
            PaymentTransition::Unchanged(status) => AuditAction::PaymentStatusConfirmed { status },
            PaymentTransition::Changed { from, to, .. } => AuditAction::PaymentStatusChanged { from, to },
            PaymentTransition::RegressionIgnored { current, attempted } => {
                AuditAction::RegressionIgnored { current, attempted }
            }
        };
        self.record(update.source(), action);
        self.updated_at = update.snapshot.at;
        transition
    }

    /// Applies an allow-listed admin edit. Shipping status only moves forward.
    pub fn apply_edit(&mut self, edit: &OrderEdit) -> Result<EditOutcome, ValidationError> {
        let mut outcome = EditOutcome::default();

        if let Some(target) = edit.shipping_status {
            if target != self.shipping_status {
                let from = self.shipping_status;
                self.shipping_status = from.transition_to(target)?;
                outcome.shipping_transition = Some((from, target));
                outcome.changed_fields.push("shipping_status".to_string());
            }
        }
        if let Some(status) = edit.payment_status {
            if status != self.payment_status {
                let from = self.payment_status;
                self.payment_status = status;
                self.record(
                    ChangeSource::AdminEdit,
                    AuditAction::PaymentStatusChanged { from, to: status },
                );
                outcome.changed_fields.push("payment_status".to_string());
            }
        }
        for (name, slot, value) in [
            ("tracking", &mut self.tracking, &edit.tracking),
            ("carrier", &mut self.carrier, &edit.carrier),
            ("shipping_note", &mut self.shipping_note, &edit.shipping_note),
        ] {
            if let Some(value) = value {
                if slot != value {
                    slot.clone_from(value);
                    outcome.changed_fields.push(name.to_string());
                }
            }
        }
        if edit.restore && self.deleted_at.take().is_some() {
            self.record(ChangeSource::AdminEdit, AuditAction::Restored);
            outcome.changed_fields.push("deleted_at".to_string());
        }

        if !outcome.changed_fields.is_empty() {
            self.record(
                ChangeSource::AdminEdit,
                AuditAction::FieldsUpdated {
                    fields: outcome.changed_fields.clone(),
                },
            );
            self.updated_at = Timestamp::now();
        }
        Ok(outcome)
    }

    /// Marks the order deleted. Returns false when it already was.
    pub fn soft_delete(&mut self) -> bool {
        if self.is_deleted() {
            return false;
        }
        let now = Timestamp::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
        self.record(ChangeSource::AdminEdit, AuditAction::Deleted);
        true
    }

    fn record(&mut self, source: ChangeSource, action: AuditAction) {
        self.audit_log.push(AuditEntry {
            at: Timestamp::now(),
            source,
            action,
        });
        if self.audit_log.len() > AUDIT_LOG_LIMIT {
            let excess = self.audit_log.len() - AUDIT_LOG_LIMIT;
            self.audit_log.drain(..excess);
        }
    }
}
