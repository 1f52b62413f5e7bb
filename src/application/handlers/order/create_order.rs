//! CreateOrderHandler - checkout.
//!
//! The order is stored before the preference is created so a notification
//! racing the checkout response already finds it. A provider failure does
//! not fail the checkout; the order simply has no redirect yet.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ErrorCode, Timestamp};
use crate::domain::order::{generate_order_number, Order, OrderPayload};
use crate::ports::{
    BackUrls, OrderRepository, PaymentProvider, PreferenceItem, PreferenceRequest,
};

use super::errors::OrderCommandError;

const MAX_ID_ATTEMPTS: usize = 5;

/// Line item as sent by the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "name")]
    pub title: String,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub unit_price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOrderCommand {
    pub customer: Option<Value>,
    pub items: Vec<CheckoutItem>,
    pub shipping_address: Option<Value>,
    pub payer_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderResult {
    pub order: Order,
    pub init_point: Option<String>,
}

/// Checkout settings derived from configuration.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public base URL for notification and back URLs.
    pub public_url: Option<String>,
    pub currency: String,
    /// Use the sandbox redirect when present.
    pub sandbox: bool,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            public_url: None,
            currency: "ARS".to_string(),
            sandbox: false,
        }
    }
}

pub struct CreateOrderHandler {
    repository: Arc<dyn OrderRepository>,
    provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl CreateOrderHandler {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        provider: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            repository,
            provider,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateOrderCommand,
    ) -> Result<CreateOrderResult, OrderCommandError> {
        validate_items(&cmd.items)?;

        let total = cmd
            .items
            .iter()
            .map(|i| i.unit_price * f64::from(i.quantity))
            .sum::<f64>();
        let payload = OrderPayload {
            customer: cmd.customer.clone(),
            items: cmd
                .items
                .iter()
                .map(|i| serde_json::to_value(i).unwrap_or(Value::Null))
                .collect(),
            shipping_address: cmd.shipping_address.clone(),
            total: Some(total),
            currency: Some(self.settings.currency.clone()),
        };

        let mut order = self.insert_with_fresh_number(payload).await?;
        tracing::info!(order_id = %order.id, total, "Order placed");

        let request = self.preference_request(&order.id, &cmd);
        let init_point = match self.provider.create_preference(request).await {
            Ok(preference) => {
                order.preference_id = Some(preference.id.clone());
                order.updated_at = Timestamp::now();
                self.repository.update(&order).await?;
                if self.settings.sandbox {
                    preference.sandbox_init_point.or(preference.init_point)
                } else {
                    preference.init_point
                }
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Could not create checkout preference");
                None
            }
        };

        Ok(CreateOrderResult { order, init_point })
    }

    async fn insert_with_fresh_number(
        &self,
        payload: OrderPayload,
    ) -> Result<Order, OrderCommandError> {
        let mut last_error = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let order = Order::place(generate_order_number(&Timestamp::now()), None, payload.clone());
            match self.repository.insert(&order).await {
                Ok(()) => return Ok(order),
                Err(e) if e.code == ErrorCode::DuplicateOrder => last_error = Some(e),
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_error
            .map(OrderCommandError::from)
            .unwrap_or_else(|| OrderCommandError::Storage("no order number available".into())))
    }

    fn preference_request(&self, order_id: &str, cmd: &CreateOrderCommand) -> PreferenceRequest {
        let base = self
            .settings
            .public_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string());
        PreferenceRequest {
            external_reference: order_id.to_string(),
            items: cmd
                .items
                .iter()
                .map(|i| PreferenceItem {
                    id: i.id.clone(),
                    title: i.title.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    currency_id: self.settings.currency.clone(),
                })
                .collect(),
            payer_email: cmd.payer_email.clone(),
            notification_url: base.as_ref().map(|b| format!("{}/api/webhooks/mp", b)),
            back_urls: base.map(|b| BackUrls {
                success: format!("{}/success", b),
                failure: format!("{}/failure", b),
                pending: format!("{}/pending", b),
            }),
        }
    }
}

fn validate_items(items: &[CheckoutItem]) -> Result<(), OrderCommandError> {
    if items.is_empty() {
        return Err(OrderCommandError::InvalidInput("items cannot be empty".into()));
    }
    for item in items {
        if item.title.trim().is_empty() {
            return Err(OrderCommandError::InvalidInput("item title cannot be empty".into()));
        }
        if item.quantity == 0 {
            return Err(OrderCommandError::InvalidInput(format!(
                "quantity for '{}' must be positive",
                item.title
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(OrderCommandError::InvalidInput(format!(
                "unit_price for '{}' is invalid",
                item.title
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mercado_pago::MockPaymentProvider;
    use crate::adapters::storage::InMemoryOrderStore;
    use crate::domain::order::{IdentifierField, PaymentStatus, ShippingStatus};
    use crate::ports::PaymentError;

    fn item() -> CheckoutItem {
        CheckoutItem {
            id: Some("sku-1".into()),
            title: "Pantalla".into(),
            quantity: 2,
            unit_price: 150.0,
        }
    }

    fn setup(settings: CheckoutSettings) -> (CreateOrderHandler, InMemoryOrderStore, MockPaymentProvider) {
        let store = InMemoryOrderStore::new();
        let provider = MockPaymentProvider::new();
        let handler =
            CreateOrderHandler::new(Arc::new(store.clone()), Arc::new(provider.clone()), settings);
        (handler, store, provider)
    }

    #[tokio::test]
    async fn checkout_stores_order_and_preference() {
        let (handler, store, provider) = setup(CheckoutSettings {
            public_url: Some("https://shop.example/".into()),
            ..Default::default()
        });

        let result = handler
            .handle(CreateOrderCommand {
                items: vec![item()],
                ..Default::default()
            })
            .await
            .unwrap();

        let order = &result.order;
        assert!(order.id.starts_with("NRN-"));
        assert_eq!(order.order_number.as_deref(), Some(order.id.as_str()));
        assert_eq!(order.external_reference.as_deref(), Some(order.id.as_str()));
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.shipping_status, ShippingStatus::Preparing);
        assert!(!order.inventory_applied);
        assert_eq!(order.payload.total, Some(300.0));
        assert!(result.init_point.is_some());

        let stored = store
            .find_by(IdentifierField::Id, &order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.preference_id, order.preference_id);

        let request = &provider.created_preferences()[0];
        assert_eq!(request.external_reference, order.id);
        assert_eq!(
            request.notification_url.as_deref(),
            Some("https://shop.example/api/webhooks/mp")
        );
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let (handler, store, _) = setup(CheckoutSettings::default());
        let err = handler.handle(CreateOrderCommand::default()).await.unwrap_err();
        assert!(matches!(err, OrderCommandError::InvalidInput(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn provider_failure_keeps_the_order() {
        let (handler, store, provider) = setup(CheckoutSettings::default());
        provider.fail_method("create_preference", PaymentError::not_configured());

        let result = handler
            .handle(CreateOrderCommand {
                items: vec![item()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(result.init_point.is_none());
        assert!(result.order.preference_id.is_none());
        assert_eq!(store.len().await, 1);
    }
}
