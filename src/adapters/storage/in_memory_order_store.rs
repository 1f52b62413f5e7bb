//! In-Memory Order Store Adapter
//!
//! Keeps orders in process memory with the English status vocabulary.
//! Useful for testing and development.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::order::{IdentifierField, Order, StatusVocabulary};
use crate::ports::{OrderFilter, OrderRepository};

/// In-memory order store
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with orders
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Arc::new(RwLock::new(orders)),
        }
    }

    /// Number of stored orders, deleted ones included
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    /// Copy of every stored order (useful for tests)
    pub async fn snapshot(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    fn vocabulary(&self) -> StatusVocabulary {
        StatusVocabulary::English
    }

    async fn find_by(
        &self,
        field: IdentifierField,
        value: &str,
    ) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|o| o.matches(field, value)).cloned())
    }

    async fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.id == order.id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateOrder,
                format!("Order {} already exists", order.id),
            ));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        let slot = orders.iter_mut().find(|o| o.id == order.id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", order.id))
        })?;
        *slot = order.clone();
        Ok(())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders.iter().filter(|o| filter.accepts(o)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }
}
