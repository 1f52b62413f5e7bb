//! Event publisher that records order side effects in the structured log.
//!
//! Stock and e-mail integrations subscribe to these log records in
//! deployment; the publisher itself never fails.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{OrderEvent, OrderEventPublisher};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OrderEventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: OrderEvent) -> Result<(), DomainError> {
        match &event {
            OrderEvent::PaymentApproved {
                order_id,
                payment_id,
                apply_inventory,
            } => tracing::info!(
                event_type = event.event_type(),
                order_id = %order_id,
                payment_id = payment_id.as_deref().unwrap_or("-"),
                apply_inventory,
                "Order payment approved"
            ),
            OrderEvent::PaymentRejected {
                order_id,
                payment_id,
            } => tracing::info!(
                event_type = event.event_type(),
                order_id = %order_id,
                payment_id = payment_id.as_deref().unwrap_or("-"),
                "Order payment rejected"
            ),
            OrderEvent::ShippingUpdated {
                order_id, from, to, ..
            } => tracing::info!(
                event_type = event.event_type(),
                order_id = %order_id,
                from = from.as_str(),
                to = to.as_str(),
                "Order shipping updated"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_never_fails() {
        let publisher = LoggingEventPublisher::new();
        let result = publisher
            .publish(OrderEvent::PaymentRejected {
                order_id: "NRN-1".into(),
                payment_id: Some("9".into()),
            })
            .await;
        assert!(result.is_ok());
    }
}
