//! Order repository port.
//!
//! Stores implement exact-match lookup on a single identifier field plus
//! insert/update/list. Resolution across identifiers, the payment upsert
//! and admin field updates are provided on top of those primitives so
//! every store follows the same contract.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::order::{
    admin_plan, resolution_plan, EditOutcome, IdentifierField, LookupStep, Order, OrderEdit,
    OrderIdentifiers, PaymentStatus, PaymentTransition, PaymentUpdate, ReconcileMode,
    StatusVocabulary,
};

/// Filter for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub payment_status: Option<PaymentStatus>,
    /// Only orders created at or after this instant.
    pub created_since: Option<Timestamp>,
    pub include_deleted: bool,
    pub limit: Option<usize>,
}

impl OrderFilter {
    /// Whether an order passes the filter. Used by in-process stores.
    pub fn accepts(&self, order: &Order) -> bool {
        if !self.include_deleted && order.is_deleted() {
            return false;
        }
        if let Some(status) = self.payment_status {
            if order.payment_status != status {
                return false;
            }
        }
        if let Some(since) = &self.created_since {
            if since.is_after(&order.created_at) {
                return false;
            }
        }
        true
    }
}

/// Result of [`OrderRepository::upsert_payment_status`].
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    Updated {
        order: Order,
        transition: PaymentTransition,
    },
    StubCreated {
        order: Order,
    },
    /// Nothing to match on and nothing to seed a stub with.
    Unresolvable,
}

/// Repository port for orders.
///
/// Lookups include soft-deleted orders so late notifications never
/// create duplicates; only listing hides them.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Vocabulary used for payment status at rest.
    fn vocabulary(&self) -> StatusVocabulary;

    /// Exact match on one identifier field.
    async fn find_by(&self, field: IdentifierField, value: &str)
        -> Result<Option<Order>, DomainError>;

    /// Insert a new order. Fails with `DuplicateOrder` if the id exists.
    async fn insert(&self, order: &Order) -> Result<(), DomainError>;

    /// Replace a stored order. Fails with `OrderNotFound` if absent.
    async fn update(&self, order: &Order) -> Result<(), DomainError>;

    /// Orders matching a filter, newest first.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError>;

    /// Resolve an order from any identifier using its shape as a hint.
    async fn find_by_any_identifier(&self, value: &str) -> Result<Option<Order>, DomainError> {
        self.find_first(resolution_plan(value)).await
    }

    /// Resolve an order for an admin edit: id, order number, preference id.
    async fn find_for_admin(&self, value: &str) -> Result<Option<Order>, DomainError> {
        self.find_first(admin_plan(value)).await
    }

    /// Run lookup steps in order and return the first hit.
    async fn find_first(&self, steps: Vec<LookupStep>) -> Result<Option<Order>, DomainError> {
        for step in steps {
            if let Some(order) = self.find_by(step.field, &step.value).await? {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    /// Resolve an order for a payment update: preference id first, then the
    /// external reference through the full resolution plan.
    async fn resolve_for_payment(
        &self,
        ids: &OrderIdentifiers,
    ) -> Result<Option<Order>, DomainError> {
        if let Some(preference_id) = &ids.preference_id {
            if let Some(order) = self.find_by(IdentifierField::PreferenceId, preference_id).await? {
                return Ok(Some(order));
            }
        }
        match &ids.external_reference {
            Some(reference) => self.find_by_any_identifier(reference).await,
            None => Ok(None),
        }
    }

    /// Fold a payment update into the matching order, or create a stub.
    ///
    /// Only the notification path calls this; client-facing mutations use
    /// [`OrderRepository::update_fields`], which never creates.
    async fn upsert_payment_status(
        &self,
        update: &PaymentUpdate,
        mode: ReconcileMode,
    ) -> Result<UpsertOutcome, DomainError> {
        if let Some(mut order) = self.resolve_for_payment(&update.identifiers).await? {
            let transition = order.apply_payment(update, mode);
            self.update(&order).await?;
            return Ok(UpsertOutcome::Updated { order, transition });
        }
        if update.identifiers.is_unresolvable() {
            return Ok(UpsertOutcome::Unresolvable);
        }

        let stub = Order::stub(update);
        match self.insert(&stub).await {
            Ok(()) => Ok(UpsertOutcome::StubCreated { order: stub }),
            // A concurrent delivery created it first; fold into that one.
            Err(err) if err.code == ErrorCode::DuplicateOrder => {
                let mut order = self
                    .find_by(IdentifierField::Id, &stub.id)
                    .await?
                    .ok_or(err)?;
                let transition = order.apply_payment(update, mode);
                self.update(&order).await?;
                Ok(UpsertOutcome::Updated { order, transition })
            }
            Err(err) => Err(err),
        }
    }

    /// Apply an allow-listed admin edit. `Ok(None)` when no order matches.
    async fn update_fields(
        &self,
        identifier: &str,
        edit: &OrderEdit,
    ) -> Result<Option<(Order, EditOutcome)>, DomainError> {
        let Some(mut order) = self.find_for_admin(identifier).await? else {
            return Ok(None);
        };
        let outcome = order.apply_edit(edit)?;
        if !outcome.changed_fields.is_empty() {
            self.update(&order).await?;
        }
        Ok(Some((order, outcome)))
    }
}
