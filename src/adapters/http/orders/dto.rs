//! HTTP DTOs for order endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::handlers::order::{CheckoutItem, CreateOrderCommand};
use crate::domain::foundation::Timestamp;
use crate::domain::order::{Order, PaymentStatus, ShippingStatus, WebhookSnapshot};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Checkout request from the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default, alias = "cliente")]
    pub customer: Option<Value>,
    #[serde(default, alias = "productos", alias = "cart")]
    pub items: Vec<CheckoutItem>,
    #[serde(default, alias = "direccion_envio")]
    pub shipping_address: Option<Value>,
    #[serde(default, alias = "email")]
    pub payer_email: Option<String>,
}

impl From<CreateOrderRequest> for CreateOrderCommand {
    fn from(req: CreateOrderRequest) -> Self {
        let payer_email = req.payer_email.or_else(|| {
            req.customer
                .as_ref()
                .and_then(|c| c.get("email"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        CreateOrderCommand {
            customer: req.customer,
            items: req.items,
            shipping_address: req.shipping_address,
            payer_email,
        }
    }
}

/// Query string for the admin listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersParams {
    pub payment_status: Option<String>,
    #[serde(default)]
    pub include_deleted: Option<String>,
    pub limit: Option<usize>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "numeroOrden")]
    pub order_number: String,
    pub preference_id: Option<String>,
    pub init_point: Option<String>,
}

/// Storefront polling answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusResponse {
    pub status: PaymentStatus,
    #[serde(rename = "numeroOrden")]
    pub order_number: Option<String>,
}

/// Full order view for admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: String,
    pub order_number: Option<String>,
    pub preference_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub shipping_status: ShippingStatus,
    pub tracking: Option<String>,
    pub carrier: Option<String>,
    pub shipping_note: Option<String>,
    pub customer: Option<Value>,
    pub items: Vec<Value>,
    pub shipping_address: Option<Value>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub inventory_applied: bool,
    pub is_stub: bool,
    pub last_mp_webhook: Option<WebhookSnapshot>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            order_number: order.order_number.clone(),
            preference_id: order.preference_id.clone(),
            external_reference: order.external_reference.clone(),
            payment_status: order.payment_status,
            payment_id: order.payment_id.clone(),
            merchant_order_id: order.merchant_order_id.clone(),
            shipping_status: order.shipping_status,
            tracking: order.tracking.clone(),
            carrier: order.carrier.clone(),
            shipping_note: order.shipping_note.clone(),
            customer: order.payload.customer.clone(),
            items: order.payload.items.clone(),
            shipping_address: order.payload.shipping_address.clone(),
            total: order.payload.total,
            currency: order.payload.currency.clone(),
            inventory_applied: order.inventory_applied,
            is_stub: order.is_stub,
            last_mp_webhook: order.last_mp_webhook.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
            deleted_at: order.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOrderResponse {
    pub order: OrderView,
    pub changed_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOrderResponse {
    pub order_id: String,
    pub deleted: bool,
}
