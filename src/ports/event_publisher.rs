//! Order event publisher port.
//!
//! Side effects of state changes (stock, customer emails) are delivered
//! through this port. Events are emitted only on real transitions, so a
//! redelivered notification never publishes twice.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::DomainError;
use crate::domain::order::ShippingStatus;

/// Event emitted after an order change is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    PaymentApproved {
        order_id: String,
        payment_id: Option<String>,
        /// True on the first approval; stock should be taken.
        apply_inventory: bool,
    },
    PaymentRejected {
        order_id: String,
        payment_id: Option<String>,
    },
    ShippingUpdated {
        order_id: String,
        from: ShippingStatus,
        to: ShippingStatus,
        tracking: Option<String>,
        carrier: Option<String>,
    },
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::PaymentApproved { .. } => "order.payment_approved",
            OrderEvent::PaymentRejected { .. } => "order.payment_rejected",
            OrderEvent::ShippingUpdated { .. } => "order.shipping_updated",
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::PaymentApproved { order_id, .. }
            | OrderEvent::PaymentRejected { order_id, .. }
            | OrderEvent::ShippingUpdated { order_id, .. } => order_id,
        }
    }
}

/// Port for publishing order events.
#[async_trait]
pub trait OrderEventPublisher: Send + Sync {
    async fn publish(&self, event: OrderEvent) -> Result<(), DomainError>;
}
