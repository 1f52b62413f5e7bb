//! DeleteOrderHandler - soft delete.
//!
//! The order stays resolvable by notifications so a late delivery never
//! recreates it as a stub.

use std::sync::Arc;

use crate::domain::order::Order;
use crate::ports::OrderRepository;

use super::errors::OrderCommandError;

#[derive(Debug, Clone)]
pub struct DeleteOrderCommand {
    pub identifier: String,
}

#[derive(Debug, Clone)]
pub struct DeleteOrderResult {
    pub order: Order,
    /// False when the order was already deleted.
    pub deleted: bool,
}

pub struct DeleteOrderHandler {
    repository: Arc<dyn OrderRepository>,
}

impl DeleteOrderHandler {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        cmd: DeleteOrderCommand,
    ) -> Result<DeleteOrderResult, OrderCommandError> {
        let mut order = self
            .repository
            .find_for_admin(&cmd.identifier)
            .await?
            .ok_or_else(|| OrderCommandError::OrderNotFound(cmd.identifier.clone()))?;

        let deleted = order.soft_delete();
        if deleted {
            self.repository.update(&order).await?;
            tracing::info!(order_id = %order.id, "Order soft-deleted");
        }

        Ok(DeleteOrderResult { order, deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryOrderStore;
    use crate::domain::order::{IdentifierField, OrderPayload};
    use crate::ports::OrderFilter;

    #[tokio::test]
    async fn deleted_order_is_hidden_from_listing_but_still_resolvable() {
        let store = InMemoryOrderStore::with_orders(vec![Order::place(
            "NRN-1",
            None,
            OrderPayload::default(),
        )]);
        let handler = DeleteOrderHandler::new(Arc::new(store.clone()));

        let result = handler
            .handle(DeleteOrderCommand {
                identifier: "NRN-1".into(),
            })
            .await
            .unwrap();
        assert!(result.deleted);

        assert!(store.list(&OrderFilter::default()).await.unwrap().is_empty());
        assert!(store
            .find_by(IdentifierField::Id, "NRN-1")
            .await
            .unwrap()
            .is_some());

        let again = handler
            .handle(DeleteOrderCommand {
                identifier: "NRN-1".into(),
            })
            .await
            .unwrap();
        assert!(!again.deleted);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let handler = DeleteOrderHandler::new(Arc::new(InMemoryOrderStore::new()));
        let err = handler
            .handle(DeleteOrderCommand {
                identifier: "X".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderCommandError::OrderNotFound(_)));
    }
}
