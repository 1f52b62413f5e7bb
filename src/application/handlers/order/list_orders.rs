//! ListOrdersHandler - admin listing, newest first.

use std::sync::Arc;

use crate::domain::order::{Order, PaymentStatus};
use crate::ports::{OrderFilter, OrderRepository};

use super::errors::OrderCommandError;

#[derive(Debug, Clone, Default)]
pub struct ListOrdersQuery {
    /// Status label in either vocabulary.
    pub payment_status: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<usize>,
}

pub struct ListOrdersHandler {
    repository: Arc<dyn OrderRepository>,
}

impl ListOrdersHandler {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: ListOrdersQuery) -> Result<Vec<Order>, OrderCommandError> {
        let payment_status = match query.payment_status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(PaymentStatus::parse_label(raw).ok_or_else(|| {
                OrderCommandError::InvalidInput(format!("unknown payment_status '{}'", raw))
            })?),
        };

        let filter = OrderFilter {
            payment_status,
            created_since: None,
            include_deleted: query.include_deleted,
            limit: query.limit,
        };
        Ok(self.repository.list(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryOrderStore;
    use crate::domain::order::OrderPayload;

    fn store() -> InMemoryOrderStore {
        let mut paid = Order::place("NRN-2", None, OrderPayload::default());
        paid.payment_status = PaymentStatus::Approved;
        InMemoryOrderStore::with_orders(vec![Order::place("NRN-1", None, OrderPayload::default()), paid])
    }

    #[tokio::test]
    async fn filters_by_spanish_label() {
        let handler = ListOrdersHandler::new(Arc::new(store()));
        let orders = handler
            .handle(ListOrdersQuery {
                payment_status: Some("aprobado".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "NRN-2");
    }

    #[tokio::test]
    async fn unknown_status_label_is_invalid() {
        let handler = ListOrdersHandler::new(Arc::new(store()));
        let err = handler
            .handle(ListOrdersQuery {
                payment_status: Some("teleported".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderCommandError::InvalidInput(_)));
    }
}
