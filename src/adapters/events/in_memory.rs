//! Recording event publisher for tests.
//!
//! Captures every published event in order so tests can assert that side
//! effects happen exactly once.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{OrderEvent, OrderEventPublisher};

/// In-memory order event sink.
///
/// # Example
///
/// ```ignore
/// let events = InMemoryOrderEvents::new();
/// handler.handle(cmd).await?;
/// assert_eq!(events.count_of("order.payment_approved"), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryOrderEvents {
    published: Arc<RwLock<Vec<OrderEvent>>>,
    fail_publish: Arc<RwLock<bool>>,
}

impl InMemoryOrderEvents {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    pub fn published(&self) -> Vec<OrderEvent> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.published()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make subsequent publishes fail.
    pub fn set_failing(&self, failing: bool) {
        *self
            .fail_publish
            .write()
            .unwrap_or_else(PoisonError::into_inner) = failing;
    }
}

#[async_trait]
impl OrderEventPublisher for InMemoryOrderEvents {
    async fn publish(&self, event: OrderEvent) -> Result<(), DomainError> {
        if *self.fail_publish.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "Simulated publish failure",
            ));
        }
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
