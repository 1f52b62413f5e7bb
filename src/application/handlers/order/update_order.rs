//! UpdateOrderHandler - allow-listed admin edits.
//!
//! Lookup tries the order id, then the order number, then the preference
//! id. Unknown fields are dropped silently; a body with no recognized
//! field is rejected. This path never creates orders.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::order::{EditOutcome, Order, OrderEdit};
use crate::ports::{OrderEvent, OrderEventPublisher, OrderRepository};

use super::errors::OrderCommandError;

#[derive(Debug, Clone)]
pub struct UpdateOrderCommand {
    pub identifier: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct UpdateOrderResult {
    pub order: Order,
    /// Empty when every supplied value already matched.
    pub changed_fields: Vec<String>,
}

pub struct UpdateOrderHandler {
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn OrderEventPublisher>,
}

impl UpdateOrderHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        publisher: Arc<dyn OrderEventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateOrderCommand,
    ) -> Result<UpdateOrderResult, OrderCommandError> {
        let edit = OrderEdit::from_fields(&cmd.fields)?;
        if edit.is_empty() {
            return Err(OrderCommandError::NoFields);
        }

        let (order, outcome) = self
            .repository
            .update_fields(&cmd.identifier, &edit)
            .await?
            .ok_or_else(|| OrderCommandError::OrderNotFound(cmd.identifier.clone()))?;

        tracing::info!(
            order_id = %order.id,
            fields = ?outcome.changed_fields,
            "Order updated by admin"
        );
        self.publish_shipping(&order, &outcome).await;

        Ok(UpdateOrderResult {
            order,
            changed_fields: outcome.changed_fields,
        })
    }

    async fn publish_shipping(&self, order: &Order, outcome: &EditOutcome) {
        let Some((from, to)) = outcome.shipping_transition else {
            return;
        };
        let event = OrderEvent::ShippingUpdated {
            order_id: order.id.clone(),
            from,
            to,
            tracking: order.tracking.clone(),
            carrier: order.carrier.clone(),
        };
        if let Err(e) = self.publisher.publish(event).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to publish shipping update");
        }
    }
}
