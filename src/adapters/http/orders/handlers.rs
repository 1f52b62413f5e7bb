//! HTTP handlers for order endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use serde_json::Value;

use crate::application::handlers::order::{
    cache_control_for, DeleteOrderCommand, GetOrderStatusQuery, ListOrdersQuery,
    UpdateOrderCommand,
};
use crate::config::parse_flag;

use super::super::error::ApiError;
use super::super::state::AppState;
use super::dto::{
    CreateOrderRequest, CreateOrderResponse, DeleteOrderResponse, ListOrdersParams,
    OrderListResponse, OrderStatusResponse, OrderView, UpdateOrderResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/orders/:id/status - Storefront polling
///
/// Never 404s: an unknown order reads as pending.
pub async fn get_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .status_handler()
        .handle(GetOrderStatusQuery { identifier: id })
        .await?;

    let body = OrderStatusResponse {
        status: result.status,
        order_number: result.order_number,
    };
    Ok((
        [(header::CACHE_CONTROL, cache_control_for(result.status))],
        Json(body),
    ))
}

/// GET /api/orders - Admin listing, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
) -> Result<impl IntoResponse, ApiError> {
    let include_deleted = params
        .include_deleted
        .as_deref()
        .and_then(parse_flag)
        .unwrap_or(false);
    let orders = state
        .list_orders_handler()
        .handle(ListOrdersQuery {
            payment_status: params.payment_status,
            include_deleted,
            limit: params.limit,
        })
        .await?;

    Ok(Json(OrderListResponse {
        orders: orders.iter().map(OrderView::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/orders - Checkout
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.create_order_handler().handle(request.into()).await?;

    let body = CreateOrderResponse {
        order_number: result.order.id.clone(),
        preference_id: result.order.preference_id.clone(),
        init_point: result.init_point,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// PUT /api/orders/:id - Allow-listed admin edit
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let Value::Object(fields) = body else {
        return Err(ApiError::bad_request("body must be a JSON object"));
    };
    let result = state
        .update_order_handler()
        .handle(UpdateOrderCommand {
            identifier: id,
            fields,
        })
        .await?;

    Ok(Json(UpdateOrderResponse {
        order: OrderView::from(&result.order),
        changed_fields: result.changed_fields,
    }))
}

/// DELETE /api/orders/:id - Soft delete
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .delete_order_handler()
        .handle(DeleteOrderCommand { identifier: id })
        .await?;

    Ok(Json(DeleteOrderResponse {
        order_id: result.order.id,
        deleted: result.deleted,
    }))
}
